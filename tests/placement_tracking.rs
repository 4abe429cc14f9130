// tests/placement_tracking.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use ad_pipeline::mock_backend::{FailureMode, MockBackend, RouteGroup};
use ad_pipeline::placement::{AdSlot, SlotSettings, SlotState};
use common::{harness, Harness};
use serde_json::json;

fn slot(h: &Harness, placement: &str, category: Option<&str>) -> AdSlot {
    AdSlot::new(
        placement,
        category,
        Arc::clone(&h.client),
        h.tracker.clone(),
        SlotSettings::from(&h.config),
    )
}

#[tokio::test]
async fn impressions_fire_once_per_committed_ad() {
    let h = harness(MockBackend::with_sample_data()).await;
    let mut slot = slot(&h, "sidebar", None);

    let state = slot.load().await;
    slot.flush_tracking().await;

    assert_eq!(state, SlotState { loading: false, error: false });
    let ids: Vec<String> = slot.visible_ads().map(|ad| ad.id.clone()).collect();
    assert_eq!(ids.len(), 2);

    let hits = h.backend.hits();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.kind == "impression"));
    for id in &ids {
        assert!(hits.iter().any(|hit| &hit.ad_id == id));
    }
}

#[tokio::test]
async fn placeholder_ids_are_never_tracked() {
    let backend = MockBackend::new();
    backend.set_ads(vec![
        json!({"id": "undefined", "targetUrl": "https://a.example"}),
        json!({"_id": "undefined"}),
        json!({"title": "no id at all"}),
        json!({"_id": "real-1", "targetUrl": "https://real.example"}),
    ]);
    let h = harness(backend).await;
    let mut slot = slot(&h, "inline", None);

    slot.load().await;
    assert_eq!(slot.click("undefined"), None);
    slot.flush_tracking().await;

    let hits = h.backend.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].ad_id, "real-1");
    assert!(h.tracker.track_impression("undefined").is_none());
}

#[tokio::test]
async fn click_navigates_even_when_tracking_fails() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Tracking, FailureMode::ServerError);
    let h = harness(backend).await;
    let mut slot = slot(&h, "header", Some("travel"));

    slot.load().await;
    let id = slot.visible_ads().next().unwrap().id.clone();
    let link = slot.click(&id);
    assert_eq!(link.as_deref(), Some("https://fabrikam.example/cabins"));

    slot.flush_tracking().await;
    // 1 次曝光 + 1 次点击均失败，只进入收集器
    assert_eq!(h.sink.failure_count(), 2);
    assert!(h.backend.hits().is_empty());
}

#[tokio::test]
async fn click_is_tracked() {
    let h = harness(MockBackend::with_sample_data()).await;
    let mut slot = slot(&h, "article-inline", None);

    slot.load().await;
    let id = slot.visible_ads().next().unwrap().id.clone();
    assert!(slot.click(&id).is_some());
    slot.flush_tracking().await;

    let clicks: Vec<_> = h.backend.hits().into_iter().filter(|hit| hit.kind == "click").collect();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].ad_id, id);
}

#[tokio::test]
async fn dismissal_does_not_refetch() {
    let h = harness(MockBackend::with_sample_data()).await;
    let mut slot = slot(&h, "sidebar", None);
    slot.load().await;
    let fetches = h.backend.active_queries().len();

    let first = slot.visible_ads().next().unwrap().id.clone();
    assert!(slot.dismiss(&first));
    assert!(!slot.dismiss(&first));

    assert_eq!(slot.fetched_len(), 2);
    assert_eq!(slot.visible_ads().count(), 1);
    assert_eq!(h.backend.active_queries().len(), fetches);
}

#[tokio::test]
async fn failed_fetch_renders_empty_placement() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Ads, FailureMode::HtmlPage);
    let h = harness(backend).await;
    let mut slot = slot(&h, "sidebar", None);

    let state = slot.load().await;
    assert_eq!(state, SlotState { loading: false, error: true });

    let view = slot.view_at(std::time::Instant::now());
    assert!(view.ads.is_empty());
    assert!(view.error);
    assert_eq!(view.container_class, "ad-sidebar-container");
    assert!(h.backend.hits().is_empty());
}

#[tokio::test]
async fn unmount_during_fetch_leaves_state_untouched() {
    let backend = MockBackend::with_sample_data();
    backend.set_failure(RouteGroup::Ads, FailureMode::Slow(200));
    let h = harness(backend).await;
    let mut slot = slot(&h, "sidebar", None);
    let handle = slot.handle();

    let unmount = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.unmount();
    };
    let (_, ()) = tokio::join!(slot.load(), unmount);
    slot.flush_tracking().await;

    assert_eq!(slot.fetched_len(), 0);
    assert!(slot.rendered_at().is_none());
    assert!(h.backend.hits().is_empty());
}

#[tokio::test]
async fn placements_on_one_page_fetch_independently() {
    let h = harness(MockBackend::with_sample_data()).await;
    let mut slots = vec![slot(&h, "header", None), slot(&h, "sidebar", None), slot(&h, "sidebar", None)];

    futures::future::join_all(slots.iter_mut().map(|s| s.load())).await;

    assert_eq!(h.backend.active_queries().len(), 3);
    let first = slots[1].visible_ads().next().unwrap().id.clone();
    slots[1].dismiss(&first);
    assert_eq!(slots[1].visible_ads().count(), 1);
    assert_eq!(slots[2].visible_ads().count(), 2);
}
