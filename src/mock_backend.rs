// src/mock_backend.rs

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{serve, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::info;
use uuid::Uuid;

use crate::error::{AdsError, AdsResult};

/// 故障注入作用的路由组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Ads,
    Tracking,
    Analytics,
    Stats,
    Campaigns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    Healthy,
    /// 模拟反向代理返回的 HTML 错误页（状态码 200）
    HtmlPage,
    /// 网关错误：502 + HTML 错误页
    BadGateway,
    Unauthorized,
    ServerError,
    /// 延迟若干毫秒后正常响应
    Slow(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingHit {
    pub ad_id: String,
    /// "impression" | "click"
    pub kind: String,
}

/// **Mock 广告后端**
/// 实现客户端依赖的全部接口，供 `--mock` 模式与集成测试使用。
#[derive(Debug, Default)]
pub struct MockBackend {
    ads: Mutex<Vec<Value>>,
    campaigns: Mutex<Vec<Value>>,
    stats: Mutex<Value>,
    analytics: Mutex<Option<Value>>,
    failures: Mutex<HashMap<RouteGroup, FailureMode>>,
    hits: Mutex<Vec<TrackingHit>>,
    active_queries: Mutex<Vec<HashMap<String, String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带示例数据的后端
    pub fn with_sample_data() -> Self {
        let backend = Self::new();
        backend.set_ads(sample_ads());
        backend.set_stats(json!({
            "totalAds": 3,
            "activeAds": 2,
            "weeklyAnalytics": {
                "weeklyTrends": [
                    {"week": "W39", "revenue": 182.4, "clicks": 61, "impressions": 3120},
                    {"week": "W40", "revenue": 201.9, "clicks": 70, "impressions": 3302},
                    {"week": "W41", "revenue": 188.0, "clicks": 64, "impressions": 3250},
                    {"week": "W42", "revenue": 236.5, "clicks": 83, "impressions": 3711}
                ]
            }
        }));
        for mut campaign in sample_ads() {
            if let Value::Object(ref mut map) = campaign {
                map.insert("budget".into(), json!(500.0));
                map.insert("spent".into(), json!(125.5));
            }
            lock(&backend.campaigns).push(campaign);
        }
        backend
    }

    pub fn set_ads(&self, ads: Vec<Value>) {
        *lock(&self.ads) = ads;
    }

    pub fn set_stats(&self, stats: Value) {
        *lock(&self.stats) = stats;
    }

    pub fn set_analytics(&self, analytics: Value) {
        *lock(&self.analytics) = Some(analytics);
    }

    pub fn set_failure(&self, group: RouteGroup, mode: FailureMode) {
        lock(&self.failures).insert(group, mode);
    }

    pub fn hits(&self) -> Vec<TrackingHit> {
        lock(&self.hits).clone()
    }

    pub fn active_queries(&self) -> Vec<HashMap<String, String>> {
        lock(&self.active_queries).clone()
    }

    pub fn campaign_count(&self) -> usize {
        lock(&self.campaigns).len()
    }

    async fn inject_failure(&self, group: RouteGroup) -> Option<Response> {
        let mode = lock(&self.failures).get(&group).copied().unwrap_or_default();
        match mode {
            FailureMode::Healthy => None,
            FailureMode::Slow(ms) => {
                sleep(Duration::from_millis(ms)).await;
                None
            }
            FailureMode::HtmlPage => Some(
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<!DOCTYPE html><html><body><h1>502 Bad Gateway</h1></body></html>",
                )
                    .into_response(),
            ),
            FailureMode::BadGateway => Some(
                (
                    StatusCode::BAD_GATEWAY,
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><head><title>502 Bad Gateway</title></head><body><center>nginx</center></body></html>",
                )
                    .into_response(),
            ),
            FailureMode::Unauthorized => Some(
                (StatusCode::UNAUTHORIZED, Json(json!({"message": "Not authorized"}))).into_response(),
            ),
            FailureMode::ServerError => Some(
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "Internal error"})))
                    .into_response(),
            ),
        }
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/ads/active", get(handle_active_ads))
            .route("/api/ads/stats", get(handle_stats))
            .route("/api/ads/analytics/detailed", get(handle_detailed_analytics))
            .route("/api/ads/campaigns", get(handle_list_campaigns).post(handle_create_campaign))
            .route(
                "/api/ads/campaigns/{id}",
                get(handle_get_campaign)
                    .put(handle_update_campaign)
                    .delete(handle_delete_campaign),
            )
            .route("/api/ads/campaigns/{id}/status", patch(handle_campaign_status))
            .route("/api/ads/{id}/impression", post(handle_impression))
            .route("/api/ads/{id}/click", post(handle_click))
            .with_state(self)
    }

    /// 在给定地址启动服务（端口 0 表示随机端口），返回实际监听地址
    pub async fn spawn(self: Arc<Self>, addr: &str) -> AdsResult<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AdsError::Config(format!("mock backend bind {}: {}", addr, e)))?;
        let local = listener
            .local_addr()
            .map_err(|e| AdsError::Config(format!("mock backend address: {}", e)))?;
        let app = self.router();
        info!("Mock ad backend running at http://{}", local);

        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, app).await {
                tracing::error!(error = %e, "mock backend stopped");
            }
        });
        Ok((local, handle))
    }
}

fn record_targets(record: &Value, key: &str, alias: &str, wanted: Option<&String>) -> bool {
    let Some(wanted) = wanted.filter(|w| !w.is_empty()) else {
        return true;
    };
    match record.get(key).or_else(|| record.get(alias)).and_then(Value::as_array) {
        Some(values) => values.iter().any(|v| v.as_str() == Some(wanted.as_str())),
        None => true,
    }
}

async fn handle_active_ads(
    State(backend): State<Arc<MockBackend>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Ads).await {
        return failure;
    }
    lock(&backend.active_queries).push(query.clone());

    // 不按 limit 截断，由客户端处理
    let ads: Vec<Value> = lock(&backend.ads)
        .iter()
        .filter(|ad| record_targets(ad, "targetPositions", "positions", query.get("position")))
        .filter(|ad| record_targets(ad, "targetCategories", "categories", query.get("category")))
        .cloned()
        .collect();
    Json(json!({ "success": true, "data": ads })).into_response()
}

async fn track(backend: Arc<MockBackend>, ad_id: String, kind: &str) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Tracking).await {
        return failure;
    }
    lock(&backend.hits).push(TrackingHit {
        ad_id,
        kind: kind.to_string(),
    });
    Json(json!({ "success": true })).into_response()
}

async fn handle_impression(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    track(backend, id, "impression").await
}

async fn handle_click(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    track(backend, id, "click").await
}

async fn handle_stats(State(backend): State<Arc<MockBackend>>) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Stats).await {
        return failure;
    }
    let stats = lock(&backend.stats).clone();
    Json(json!({ "success": true, "data": stats })).into_response()
}

async fn handle_detailed_analytics(
    State(backend): State<Arc<MockBackend>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Analytics).await {
        return failure;
    }
    let configured = lock(&backend.analytics).clone();
    let data = configured.unwrap_or_else(|| {
        json!({
            "period": query.get("period").cloned().unwrap_or_else(|| "7d".to_string()),
            "performanceTrends": [
                {"date": "2026-10-18", "revenue": 120.25, "clicks": 40, "impressions": 2100, "ctr": 1.9, "cpc": 3.01},
                {"date": "2026-10-19", "revenue": 131.4, "clicks": 44, "impressions": 2230, "ctr": 1.97, "cpc": 2.99}
            ],
            "summary": {
                "totalRevenue": 251.65, "totalClicks": 84, "totalImpressions": 4330,
                "averageCtr": 1.94, "averageCpc": 3.0, "averageDailyRevenue": 125.83
            }
        })
    });
    Json(json!({ "success": true, "data": data })).into_response()
}

fn matches_id(record: &Value, id: &str) -> bool {
    record.get("_id").and_then(Value::as_str) == Some(id) || record.get("id").and_then(Value::as_str) == Some(id)
}

fn not_found(id: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": format!("campaign {} not found", id) }))).into_response()
}

async fn handle_list_campaigns(State(backend): State<Arc<MockBackend>>) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    let campaigns = lock(&backend.campaigns).clone();
    Json(json!({ "success": true, "data": campaigns })).into_response()
}

async fn handle_get_campaign(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    let found = lock(&backend.campaigns).iter().find(|c| matches_id(c, &id)).cloned();
    match found {
        Some(campaign) => Json(json!({ "success": true, "data": campaign })).into_response(),
        None => not_found(&id),
    }
}

async fn handle_create_campaign(State(backend): State<Arc<MockBackend>>, Json(mut body): Json<Value>) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    if let Value::Object(ref mut map) = body {
        // 与真实后端一致，只返回数据库 `_id`
        map.insert("_id".into(), json!(Uuid::new_v4().simple().to_string()));
        map.insert("status".into(), json!("pending"));
        map.entry("spent").or_insert(json!(0.0));
    }
    lock(&backend.campaigns).push(body.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "data": body }))).into_response()
}

async fn handle_update_campaign(
    State(backend): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    let mut campaigns = lock(&backend.campaigns);
    let Some(campaign) = campaigns.iter_mut().find(|c| matches_id(c, &id)) else {
        return not_found(&id);
    };
    if let (Value::Object(target), Value::Object(patch)) = (&mut *campaign, body) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
    Json(json!({ "success": true, "data": campaign.clone() })).into_response()
}

async fn handle_campaign_status(
    State(backend): State<Arc<MockBackend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    let mut campaigns = lock(&backend.campaigns);
    let Some(campaign) = campaigns.iter_mut().find(|c| matches_id(c, &id)) else {
        return not_found(&id);
    };
    if let (Value::Object(target), Some(status)) = (&mut *campaign, body.get("status")) {
        target.insert("status".into(), status.clone());
    }
    Json(json!({ "success": true, "data": campaign.clone() })).into_response()
}

async fn handle_delete_campaign(State(backend): State<Arc<MockBackend>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = backend.inject_failure(RouteGroup::Campaigns).await {
        return failure;
    }
    let mut campaigns = lock(&backend.campaigns);
    let before = campaigns.len();
    campaigns.retain(|c| !matches_id(c, &id));
    if campaigns.len() == before {
        return not_found(&id);
    }
    StatusCode::NO_CONTENT.into_response()
}

/// `--mock` 模式下的示例广告
pub fn sample_ads() -> Vec<Value> {
    vec![
        json!({
            "_id": "6710a1c2e4b0f1a2b3c4d5e6",
            "title": "Index funds, explained",
            "description": "Start investing with as little as $10.",
            "advertiserName": "Northwind Capital",
            "targetUrl": "https://northwind.example/invest",
            "imageUrl": "https://cdn.example/ads/northwind.png",
            "mediaType": "image",
            "targetCategories": ["finance"],
            "targetPositions": ["sidebar", "article-bottom"],
            "impressions": 10412,
            "clicks": 233,
            "status": "active"
        }),
        json!({
            "_id": "6710a1c2e4b0f1a2b3c4d5e7",
            "title": "Code faster",
            "description": "The editor built for teams.",
            "advertiserName": "Contoso Tools",
            "targetUrl": "https://contoso.example",
            "imageUrl": "https://cdn.example/ads/contoso-demo.mp4",
            "targetCategories": ["technology"],
            "targetPositions": ["inline", "between-posts", "article-inline"],
            "impressions": 5120,
            "clicks": 98,
            "status": "active"
        }),
        json!({
            "_id": "6710a1c2e4b0f1a2b3c4d5e8",
            "title": "Weekend getaways",
            "description": "Cabins within two hours of the city.",
            "advertiserName": "Fabrikam Travel",
            "targetUrl": "https://fabrikam.example/cabins",
            "imageUrl": "https://cdn.example/ads/fabrikam.jpg",
            "targetCategories": ["travel", "lifestyle"],
            "targetPositions": ["header", "article-header", "sidebar"],
            "impressions": 8870,
            "clicks": 150,
            "status": "active"
        }),
    ]
}
