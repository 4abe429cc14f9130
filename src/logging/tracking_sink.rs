// src/logging/tracking_sink.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::time::{self, Duration};
use tracing::warn;

use crate::error::AdsError;

pub const DEFAULT_BUFFER_SIZE: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackingKind {
    Impression,
    Click,
}

/// **一次失败的上报**
#[derive(Serialize, Debug, Clone)]
pub struct TrackingFailure {
    pub timestamp: String,
    pub kind: TrackingKind,
    pub ad_id: String,
    pub error_kind: &'static str,
    pub message: String,
}

impl TrackingFailure {
    pub fn new(kind: TrackingKind, ad_id: &str, error: &AdsError) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            ad_id: ad_id.to_string(),
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// **上报失败的收集器**
/// 失败记录通过 mpsc 发给后台任务，按批次或定时写入日志；调用方永远不会被阻塞。
#[derive(Clone, Debug)]
pub struct TrackingSink {
    sender: Sender<TrackingFailure>,
    failures: Arc<AtomicU64>,
}

impl TrackingSink {
    /// 需要在 tokio 运行时内调用
    pub fn spawn(buffer_size: usize, batch_size: usize, flush_interval: u64) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        tokio::spawn(Self::background_writer(receiver, batch_size.max(1), flush_interval));
        Self {
            sender,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::spawn(DEFAULT_BUFFER_SIZE, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS)
    }

    /// 记录一次失败；通道已满时直接写日志
    pub fn report(&self, failure: TrackingFailure) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) | Err(TrySendError::Closed(failure)) => {
                warn!(
                    kind = ?failure.kind,
                    ad_id = %failure.ad_id,
                    error = %failure.message,
                    "tracking call failed (sink unavailable)"
                );
            }
        }
    }

    /// 累计失败次数
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn background_writer(
        mut receiver: Receiver<TrackingFailure>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffer = Vec::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval.max(1)));

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(failure) => {
                        buffer.push(failure);
                        if buffer.len() >= batch_size {
                            Self::flush(&mut buffer);
                        }
                    }
                    None => {
                        Self::flush(&mut buffer);
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush(&mut buffer);
                }
            }
        }
    }

    fn flush(buffer: &mut Vec<TrackingFailure>) {
        if buffer.is_empty() {
            return;
        }
        let details = serde_json::to_string(&buffer).unwrap_or_default();
        warn!(count = buffer.len(), details = %details, "tracking calls failed");
        buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_every_report() {
        let sink = TrackingSink::spawn(4, 2, 10);
        for i in 0..3 {
            sink.report(TrackingFailure::new(
                TrackingKind::Click,
                &format!("ad-{i}"),
                &AdsError::Timeout(15_000),
            ));
        }
        assert_eq!(sink.failure_count(), 3);
    }

    #[tokio::test]
    async fn full_channel_never_blocks() {
        let sink = TrackingSink::spawn(1, 100, 60_000);
        for _ in 0..50 {
            sink.report(TrackingFailure::new(
                TrackingKind::Impression,
                "ad",
                &AdsError::SessionExpired,
            ));
        }
        assert_eq!(sink.failure_count(), 50);
    }

    #[test]
    fn failure_records_error_kind() {
        let failure = TrackingFailure::new(
            TrackingKind::Impression,
            "ad-1",
            &AdsError::Status { status: 502, message: "bad gateway".into() },
        );
        assert_eq!(failure.error_kind, "status");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "impression");
    }
}
