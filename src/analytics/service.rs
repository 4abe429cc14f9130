// src/analytics/service.rs

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::analytics::{fallback, weekly, WeeklyTrends};
use crate::client::AdClient;
use crate::model::analytics::{AnalyticsSnapshot, Period};

/// 分析页的数据（实时或兜底）
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub period: Period,
    pub snapshot: AnalyticsSnapshot,
    /// 401 时置位，由调用方跳转登录
    pub session_expired: bool,
}

impl AnalyticsView {
    pub fn is_fallback(&self) -> bool {
        self.snapshot.is_fallback
    }
}

/// **管理端分析数据服务**
/// 实时接口失败（网络、超时、非 2xx、非 JSON）时用兜底生成器补齐，`load` 不会返回错误。
pub struct AnalyticsService {
    client: Arc<AdClient>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    today: Option<NaiveDate>,
}

impl AnalyticsService {
    pub fn new(client: Arc<AdClient>) -> Self {
        Self::with_rng(client, Box::new(StdRng::from_entropy()))
    }

    /// 注入随机源，测试中使用固定种子
    pub fn with_rng(client: Arc<AdClient>, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
            today: None,
        }
    }

    /// 固定兜底数据的结束日期
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub async fn load(&self, period: Period) -> AnalyticsView {
        match self.client.get_detailed_analytics(period).await {
            Ok(mut snapshot) => {
                snapshot.is_fallback = false;
                snapshot.fallback_reason = None;
                info!(%period, points = snapshot.performance_trends.len(), "loaded live analytics");
                AnalyticsView {
                    period,
                    snapshot,
                    session_expired: false,
                }
            }
            Err(e) => {
                warn!(%period, error_kind = e.kind(), error = %e, "analytics unavailable, using fallback data");
                let reason = format!("Live analytics unavailable ({}); showing generated sample data", e);
                AnalyticsView {
                    period,
                    snapshot: self.fallback(period, &reason),
                    session_expired: e.is_session_expired(),
                }
            }
        }
    }

    /// 每次失败都重新生成，不缓存
    pub fn fallback(&self, period: Period, reason: &str) -> AnalyticsSnapshot {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        match self.rng.lock() {
            Ok(mut rng) => fallback::generate(period, today, reason, &mut **rng),
            Err(poisoned) => fallback::generate(period, today, reason, &mut **poisoned.into_inner()),
        }
    }

    /// 拉取统计数据并整理为周趋势；失败时返回占位趋势
    pub async fn load_weekly_trends(&self) -> WeeklyTrends {
        match self.client.get_stats().await {
            Ok(stats) => weekly::normalize_stats(&stats),
            Err(e) => {
                warn!(error_kind = e.kind(), error = %e, "stats unavailable, using placeholder weekly trend");
                weekly::placeholder()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn fallback_is_regenerated_each_time() {
        let client = Arc::new(AdClient::new(ClientConfig::default()).unwrap());
        let service = AnalyticsService::with_rng(client, Box::new(StdRng::seed_from_u64(1)))
            .with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let first = service.fallback(Period::SevenDays, "down");
        let second = service.fallback(Period::SevenDays, "down");
        assert!(first.is_fallback && second.is_fallback);
        assert_eq!(first.performance_trends.len(), 7);
        // 同一个随机源连续抽样，两次数据不同
        assert_ne!(first.performance_trends, second.performance_trends);
    }
}
