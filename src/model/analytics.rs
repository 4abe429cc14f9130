// src/model/analytics.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 分析报表的统计周期
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[default]
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Period {
    /// 无法识别的周期按 7d 处理
    pub fn parse(key: &str) -> Self {
        match key.trim() {
            "1d" => Period::OneDay,
            "30d" => Period::ThirtyDays,
            "90d" => Period::NinetyDays,
            _ => Period::SevenDays,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
            Period::NinetyDays => "90d",
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Period::OneDay => 1,
            Period::SevenDays => 7,
            Period::ThirtyDays => 30,
            Period::NinetyDays => 90,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 分母为 0 时返回 0
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// 计数取整，负数与缺失按 0
pub fn count(value: Option<f64>) -> u64 {
    value.map_or(0, |v| v.max(0.0).round() as u64)
}

/// 数值字段允许 `null`，按 0 处理
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// 计数字段允许浮点数与 `null`
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(count(Option::<f64>::deserialize(deserializer)?))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawTrendPoint")]
pub struct TrendPoint {
    /// YYYY-MM-DD
    pub date: String,
    pub revenue: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub cpc: f64,
}

/// 后端可能省略派生的 ctr / cpc
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrendPoint {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    revenue: Option<f64>,
    #[serde(default)]
    clicks: Option<f64>,
    #[serde(default)]
    impressions: Option<f64>,
    #[serde(default)]
    ctr: Option<f64>,
    #[serde(default)]
    cpc: Option<f64>,
}

impl From<RawTrendPoint> for TrendPoint {
    fn from(raw: RawTrendPoint) -> Self {
        let revenue = raw.revenue.unwrap_or_default();
        let clicks = count(raw.clicks);
        let impressions = count(raw.impressions);
        TrendPoint {
            date: raw.date.unwrap_or_default(),
            revenue,
            clicks,
            impressions,
            ctr: raw
                .ctr
                .unwrap_or_else(|| round2(ratio(clicks as f64, impressions as f64) * 100.0)),
            cpc: raw.cpc.unwrap_or_else(|| round2(ratio(revenue, clicks as f64))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceShare {
    pub device: String,
    #[serde(deserialize_with = "lenient_number")]
    pub percentage: f64,
    #[serde(deserialize_with = "lenient_count")]
    pub impressions: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub clicks: u64,
    #[serde(deserialize_with = "lenient_number")]
    pub revenue: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GeoShare {
    pub country: String,
    #[serde(deserialize_with = "lenient_number")]
    pub percentage: f64,
    #[serde(deserialize_with = "lenient_count")]
    pub impressions: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub clicks: u64,
    #[serde(deserialize_with = "lenient_number")]
    pub revenue: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EngagementMetrics {
    /// 秒
    #[serde(deserialize_with = "lenient_number")]
    pub avg_time_on_page: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub bounce_rate: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub pages_per_session: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub return_visitor_rate: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSummary {
    #[serde(deserialize_with = "lenient_number")]
    pub total_revenue: f64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_clicks: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_impressions: u64,
    #[serde(deserialize_with = "lenient_number")]
    pub average_ctr: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub average_cpc: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub average_daily_revenue: f64,
}

/// **详细分析数据**
/// 实时接口与兜底生成器共用此结构；兜底数据 `is_fallback = true` 并附带原因。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    #[serde(default)]
    pub performance_trends: Vec<TrendPoint>,
    #[serde(default)]
    pub device_breakdown: Vec<DeviceShare>,
    #[serde(default)]
    pub geographic_data: Vec<GeoShare>,
    #[serde(default)]
    pub engagement_metrics: EngagementMetrics,
    #[serde(default)]
    pub summary: AnalyticsSummary,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// 周趋势图的展示点
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrendPoint {
    pub label: String,
    pub revenue: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub is_current_week: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_period_defaults_to_a_week() {
        assert_eq!(Period::parse("30d"), Period::ThirtyDays);
        assert_eq!(Period::parse("1y"), Period::SevenDays);
        assert_eq!(Period::parse(""), Period::SevenDays);
        assert_eq!(Period::NinetyDays.days(), 90);
    }

    #[test]
    fn live_payload_is_not_fallback() {
        let snapshot: AnalyticsSnapshot = serde_json::from_str(
            r#"{"performanceTrends":[{"date":"2026-10-18","revenue":12.5,"clicks":4,"impressions":100,"ctr":4.0,"cpc":3.13}]}"#,
        )
        .unwrap();
        assert!(!snapshot.is_fallback);
        assert_eq!(snapshot.performance_trends.len(), 1);
        assert!(snapshot.device_breakdown.is_empty());
    }

    #[test]
    fn derived_trend_fields_are_computed_when_absent() {
        let snapshot: AnalyticsSnapshot = serde_json::from_str(
            r#"{"performanceTrends":[
                {"date":"2026-10-18","revenue":12.5,"clicks":4,"impressions":100},
                {"date":"2026-10-19","revenue":null,"clicks":2.0,"impressions":0}
            ],
            "summary":{"totalRevenue":12.5,"totalClicks":6.0}}"#,
        )
        .unwrap();
        let first = &snapshot.performance_trends[0];
        assert_eq!(first.ctr, 4.0);
        assert_eq!(first.cpc, 3.13);
        let second = &snapshot.performance_trends[1];
        assert_eq!((second.revenue, second.clicks, second.ctr, second.cpc), (0.0, 2, 0.0, 0.0));
        assert_eq!(snapshot.summary.total_clicks, 6);
        assert_eq!(snapshot.summary.total_impressions, 0);
    }

    #[test]
    fn zero_denominators_give_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(round2(ratio(0.0, 0.0) * 100.0), 0.0);
        assert_eq!(count(Some(-3.0)), 0);
        assert_eq!(count(Some(2.6)), 3);
    }
}
