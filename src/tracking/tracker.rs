// src/tracking/tracker.rs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::AdClient;
use crate::logging::{TrackingFailure, TrackingKind, TrackingSink};
use crate::model::ident::is_valid_id;

/// **曝光 / 点击上报**
/// 上报是后台任务，调用方不等待；失败只进入 `TrackingSink`，不会影响页面行为。
#[derive(Clone, Debug)]
pub struct Tracker {
    client: Arc<AdClient>,
    sink: TrackingSink,
}

impl Tracker {
    pub fn new(client: Arc<AdClient>, sink: TrackingSink) -> Self {
        Self { client, sink }
    }

    pub fn sink(&self) -> &TrackingSink {
        &self.sink
    }

    /// ID 缺失或为占位值时不发请求，返回 None
    pub fn track_impression(&self, ad_id: &str) -> Option<JoinHandle<()>> {
        self.fire(TrackingKind::Impression, ad_id)
    }

    pub fn track_click(&self, ad_id: &str) -> Option<JoinHandle<()>> {
        self.fire(TrackingKind::Click, ad_id)
    }

    fn fire(&self, kind: TrackingKind, ad_id: &str) -> Option<JoinHandle<()>> {
        if !is_valid_id(ad_id) {
            debug!(?kind, ad_id, "skipping tracking for invalid ad id");
            return None;
        }

        let client = Arc::clone(&self.client);
        let sink = self.sink.clone();
        let ad_id = ad_id.to_string();
        Some(tokio::spawn(async move {
            let result = match kind {
                TrackingKind::Impression => client.post_impression(&ad_id).await,
                TrackingKind::Click => client.post_click(&ad_id).await,
            };
            if let Err(e) = result {
                sink.report(TrackingFailure::new(kind, &ad_id, &e));
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[tokio::test]
    async fn invalid_ids_are_skipped() {
        let client = Arc::new(AdClient::new(ClientConfig::default()).unwrap());
        let tracker = Tracker::new(client, TrackingSink::spawn(8, 1, 10));
        assert!(tracker.track_impression("undefined").is_none());
        assert!(tracker.track_click("").is_none());
        assert!(tracker.track_click("   ").is_none());
        assert_eq!(tracker.sink().failure_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_is_swallowed() {
        // 端口 9 (discard) 通常无人监听，连接会被拒绝
        let config = ClientConfig::new("http://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_millis(500));
        let tracker = Tracker::new(
            Arc::new(AdClient::new(config).unwrap()),
            TrackingSink::spawn(8, 1, 10),
        );
        let handle = tracker.track_click("ad-1").unwrap();
        handle.await.unwrap();
        assert_eq!(tracker.sink().failure_count(), 1);
    }
}
