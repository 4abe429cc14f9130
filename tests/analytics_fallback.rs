// tests/analytics_fallback.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use ad_pipeline::analytics::{AnalyticsService, TrendSource};
use ad_pipeline::mock_backend::{FailureMode, MockBackend, RouteGroup};
use ad_pipeline::model::Period;
use chrono::NaiveDate;
use common::{harness, harness_with_timeout};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

fn service(client: Arc<ad_pipeline::AdClient>) -> AnalyticsService {
    AnalyticsService::with_rng(client, Box::new(StdRng::seed_from_u64(2026)))
        .with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
}

#[tokio::test]
async fn live_analytics_pass_through() {
    let h = harness(MockBackend::with_sample_data()).await;
    let view = service(Arc::clone(&h.client)).load(Period::SevenDays).await;

    assert!(!view.is_fallback());
    assert!(!view.session_expired);
    assert_eq!(view.snapshot.performance_trends.len(), 2);
    assert_eq!(view.snapshot.summary.total_clicks, 84);
}

#[tokio::test]
async fn live_payload_without_derived_fields_is_still_live() {
    let backend = MockBackend::new();
    backend.set_analytics(json!({
        "performanceTrends": [
            {"date": "2026-10-18", "revenue": 12.5, "clicks": 4, "impressions": 100},
            {"date": "2026-10-19", "revenue": 20.0, "clicks": 8.0, "impressions": 160.0}
        ]
    }));
    let h = harness(backend).await;

    let view = service(Arc::clone(&h.client)).load(Period::SevenDays).await;

    assert!(!view.is_fallback(), "{:?}", view.snapshot.fallback_reason);
    let trends = &view.snapshot.performance_trends;
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].ctr, 4.0);
    assert_eq!(trends[1].clicks, 8);
    assert_eq!(trends[1].cpc, 2.5);
}

#[tokio::test]
async fn timeout_resolves_to_tagged_fallback() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Analytics, FailureMode::Slow(1_000));
    let h = harness_with_timeout(backend, Duration::from_millis(100)).await;

    let view = service(Arc::clone(&h.client)).load(Period::ThirtyDays).await;

    assert!(view.is_fallback());
    assert!(view.snapshot.is_fallback);
    let reason = view.snapshot.fallback_reason.as_deref().unwrap();
    assert!(reason.contains("timed out"), "{reason}");
    assert_eq!(view.snapshot.performance_trends.len(), 30);
    assert!(!view.session_expired);
}

#[tokio::test]
async fn html_and_server_errors_fall_back() {
    for mode in [FailureMode::HtmlPage, FailureMode::BadGateway, FailureMode::ServerError] {
        let backend = MockBackend::with_sample_data();
        backend.set_failure(RouteGroup::Analytics, mode);
        let h = harness(backend).await;

        let view = service(Arc::clone(&h.client)).load(Period::OneDay).await;
        assert!(view.is_fallback(), "{mode:?}");
        assert_eq!(view.snapshot.performance_trends.len(), 1);
    }
}

#[tokio::test]
async fn expired_session_is_flagged_alongside_fallback() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Analytics, FailureMode::Unauthorized);
    let h = harness(backend).await;

    let view = service(Arc::clone(&h.client)).load(Period::SevenDays).await;
    assert!(view.session_expired);
    assert!(view.is_fallback());
}

#[tokio::test]
async fn weekly_trends_from_live_stats() {
    let h = harness(MockBackend::with_sample_data()).await;
    let trends = service(Arc::clone(&h.client)).load_weekly_trends().await;

    assert_eq!(trends.source, TrendSource::Modern);
    let labels: Vec<&str> = trends.points.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["3 Weeks Ago", "2 Weeks Ago", "Last Week", "This Week"]);
}

#[tokio::test]
async fn weekly_trends_use_legacy_shape() {
    let backend = MockBackend::new();
    backend.set_stats(json!({"weeklyRevenue": [{"week": "W41", "revenue": 40.0}, {"week": "W42", "revenue": 55.0}]}));
    let h = harness(backend).await;

    let trends = service(Arc::clone(&h.client)).load_weekly_trends().await;
    assert_eq!(trends.source, TrendSource::Legacy);
    assert_eq!(trends.points[1].label, "This Week");
    assert_eq!(trends.points[1].revenue, 55.0);
}

#[tokio::test]
async fn weekly_trends_placeholder_when_stats_fail() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Stats, FailureMode::ServerError);
    let h = harness(backend).await;

    let trends = service(Arc::clone(&h.client)).load_weekly_trends().await;
    assert!(trends.is_placeholder());
    assert_eq!(trends.points.len(), 4);
    assert!(trends.points[3].is_current_week);
}
