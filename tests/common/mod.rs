// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ad_pipeline::logging::TrackingSink;
use ad_pipeline::mock_backend::MockBackend;
use ad_pipeline::tracking::Tracker;
use ad_pipeline::{AdClient, ClientConfig};

pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub client: Arc<AdClient>,
    pub tracker: Tracker,
    pub sink: TrackingSink,
    pub config: ClientConfig,
}

pub async fn harness(backend: MockBackend) -> Harness {
    harness_with_timeout(backend, Duration::from_secs(5)).await
}

pub async fn harness_with_timeout(backend: MockBackend, timeout: Duration) -> Harness {
    let backend = Arc::new(backend);
    let (addr, _server) = Arc::clone(&backend).spawn("127.0.0.1:0").await.unwrap();
    let config = ClientConfig::new(&format!("http://{}", addr)).with_timeout(timeout);
    let client = Arc::new(AdClient::new(config.clone()).unwrap());
    let sink = TrackingSink::spawn(64, 1, 10);
    let tracker = Tracker::new(Arc::clone(&client), sink.clone());
    Harness {
        backend,
        client,
        tracker,
        sink,
        config,
    }
}
