// src/analytics/fallback.rs

use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::model::analytics::{
    ratio, round2, AnalyticsSnapshot, AnalyticsSummary, DeviceShare, EngagementMetrics, GeoShare,
    Period, TrendPoint,
};

/// 整个周期的基准量（收入、点击、曝光）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseRates {
    pub revenue: f64,
    pub clicks: f64,
    pub impressions: f64,
}

pub fn base_rates(period: Period) -> BaseRates {
    let (revenue, clicks, impressions) = match period {
        Period::OneDay => (120.0, 40.0, 2_000.0),
        Period::SevenDays => (850.0, 280.0, 14_000.0),
        Period::ThirtyDays => (3_600.0, 1_200.0, 60_000.0),
        Period::NinetyDays => (10_800.0, 3_600.0, 180_000.0),
    };
    BaseRates { revenue, clicks, impressions }
}

const TREND_START: f64 = 0.9;
const TREND_END: f64 = 1.3;
const NOISE_MIN: f64 = 0.7;
const NOISE_MAX: f64 = 1.3;

const DEVICE_SHARES: [(&str, f64); 3] = [("desktop", 58.0), ("mobile", 35.0), ("tablet", 7.0)];

const GEO_SHARES: [(&str, f64); 6] = [
    ("United States", 42.0),
    ("United Kingdom", 15.0),
    ("Canada", 12.0),
    ("Germany", 10.0),
    ("Australia", 8.0),
    ("Other", 13.0),
];

/// 从最早一天 0.9 线性爬升到最新一天 1.3；单日周期取最新值
pub fn trend_factor(day_index: u32, days: u32) -> f64 {
    if days <= 1 {
        return TREND_END;
    }
    TREND_START + (TREND_END - TREND_START) * f64::from(day_index) / f64::from(days - 1)
}

/// **生成兜底分析数据**
/// 仅在实时接口失败时使用；随机源由调用方注入，测试中使用固定种子。
pub fn generate<R: Rng + ?Sized>(
    period: Period,
    end_date: NaiveDate,
    reason: &str,
    rng: &mut R,
) -> AnalyticsSnapshot {
    let days = period.days();
    let base = base_rates(period);
    let per_day = BaseRates {
        revenue: base.revenue / f64::from(days),
        clicks: base.clicks / f64::from(days),
        impressions: base.impressions / f64::from(days),
    };

    let mut performance_trends = Vec::with_capacity(days as usize);
    let mut total_revenue = 0.0;
    let mut total_clicks = 0u64;
    let mut total_impressions = 0u64;

    for i in 0..days {
        let date = end_date - Duration::days(i64::from(days - 1 - i));
        let trend = trend_factor(i, days);

        let revenue = round2(per_day.revenue * trend * rng.gen_range(NOISE_MIN..=NOISE_MAX));
        let clicks = (per_day.clicks * trend * rng.gen_range(NOISE_MIN..=NOISE_MAX)).round() as u64;
        let impressions =
            (per_day.impressions * trend * rng.gen_range(NOISE_MIN..=NOISE_MAX)).round() as u64;

        total_revenue += revenue;
        total_clicks += clicks;
        total_impressions += impressions;

        performance_trends.push(TrendPoint {
            date: date.format("%Y-%m-%d").to_string(),
            revenue,
            clicks,
            impressions,
            ctr: round2(ratio(clicks as f64, impressions as f64) * 100.0),
            cpc: round2(ratio(revenue, clicks as f64)),
        });
    }

    let total_revenue = round2(total_revenue);
    let summary = AnalyticsSummary {
        total_revenue,
        total_clicks,
        total_impressions,
        average_ctr: round2(ratio(total_clicks as f64, total_impressions as f64) * 100.0),
        average_cpc: round2(ratio(total_revenue, total_clicks as f64)),
        average_daily_revenue: round2(total_revenue / f64::from(days)),
    };

    let device_breakdown = DEVICE_SHARES
        .iter()
        .map(|&(device, percentage)| DeviceShare {
            device: device.to_string(),
            percentage,
            impressions: scale_count(total_impressions, percentage),
            clicks: scale_count(total_clicks, percentage),
            revenue: round2(total_revenue * percentage / 100.0),
        })
        .collect();

    let geographic_data = GEO_SHARES
        .iter()
        .map(|&(country, percentage)| GeoShare {
            country: country.to_string(),
            percentage,
            impressions: scale_count(total_impressions, percentage),
            clicks: scale_count(total_clicks, percentage),
            revenue: round2(total_revenue * percentage / 100.0),
        })
        .collect();

    AnalyticsSnapshot {
        performance_trends,
        device_breakdown,
        geographic_data,
        engagement_metrics: static_engagement(),
        summary,
        is_fallback: true,
        fallback_reason: Some(reason.to_string()),
    }
}

fn scale_count(total: u64, percentage: f64) -> u64 {
    (total as f64 * percentage / 100.0).round() as u64
}

fn static_engagement() -> EngagementMetrics {
    EngagementMetrics {
        avg_time_on_page: 154.0,
        bounce_rate: 42.3,
        pages_per_session: 3.4,
        return_visitor_rate: 28.7,
    }
}
