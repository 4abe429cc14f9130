// src/client/ad_client.rs

use std::future::Future;
use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{AdsError, AdsResult};
use crate::model::analytics::{AnalyticsSnapshot, Period};
use crate::model::campaign::{AdCampaign, CampaignDraft};
use crate::model::ident::{is_valid_id, normalize_record, normalize_records};
use crate::model::placement::{FetchMethod, Placement, PlacementConfig};
use crate::model::{AdCreative, AdStatus};

/// 错误信息中保留的响应体长度
const SNIPPET_CHARS: usize = 120;

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// **广告后端客户端**
/// 所有请求共享一个带 cookie 的 reqwest Client，单次请求整体受 `request_timeout` 约束，不做重试。
#[derive(Clone, Debug)]
pub struct AdClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl AdClient {
    pub fn new(config: ClientConfig) -> AdsResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AdsError::Config(format!("base url `{}`: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AdsError::Config(format!("base url `{}` cannot be a base", config.base_url)));
        }
        // 管理端依赖 cookie 会话
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self { client, base_url, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> AdsResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AdsError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn ad_url(&self, id: &str, tail: &[&str]) -> AdsResult<Url> {
        if !is_valid_id(id) {
            return Err(AdsError::InvalidUrl(format!("invalid ad id `{}`", id)));
        }
        let mut segments = vec!["api", "ads", id];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn campaign_url(&self, id: &str, tail: &[&str]) -> AdsResult<Url> {
        if !is_valid_id(id) {
            return Err(AdsError::InvalidUrl(format!("invalid campaign id `{}`", id)));
        }
        let mut segments = vec!["api", "ads", "campaigns", id];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    /// 整个请求（发送 + 读取响应体）受超时约束
    async fn bounded<T, F>(&self, fut: F) -> AdsResult<T>
    where
        F: Future<Output = AdsResult<T>>,
    {
        let start = Instant::now();
        match timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AdsError::Timeout(start.elapsed().as_millis())),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AdsResult<T> {
        self.bounded(async {
            let response = check_status(request.send().await?).await?;
            read_json::<T>(response).await
        })
        .await
    }

    async fn send_ignoring_body(&self, request: RequestBuilder) -> AdsResult<()> {
        self.bounded(async {
            check_status(request.send().await?).await?;
            Ok::<(), AdsError>(())
        })
        .await
    }

    /// **拉取可投放广告**
    /// `GET /api/ads/active?category=&position=&limit=`，归一化 ID 后截断到 `limit`。
    pub async fn get_active_ads(
        &self,
        category: Option<&str>,
        position: Option<&str>,
        limit: usize,
    ) -> AdsResult<Vec<AdCreative>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
            query.push(("category", category.to_string()));
        }
        if let Some(position) = position.filter(|p| !p.trim().is_empty()) {
            query.push(("position", position.to_string()));
        }
        query.push(("limit", limit.to_string()));

        let url = self.url(&["api", "ads", "active"])?;
        let envelope: ListEnvelope = self.send_json(self.client.get(url).query(&query)).await?;
        let received = envelope.data.len();

        let ads: Vec<AdCreative> = decode_records(envelope.data)
            .into_iter()
            .take(limit)
            .collect();

        debug!(
            category = category.unwrap_or_default(),
            position = position.unwrap_or_default(),
            received,
            kept = ads.len(),
            "fetched active ads"
        );
        Ok(ads)
    }

    async fn placement_ads(&self, placement: Placement, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        let config = placement.config();
        self.get_active_ads(category, Some(&config.position), config.limit).await
    }

    pub async fn get_sidebar_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::Sidebar, category).await
    }

    pub async fn get_inline_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::Inline, category).await
    }

    pub async fn get_header_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::Header, category).await
    }

    pub async fn get_between_posts_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::BetweenPosts, category).await
    }

    pub async fn get_article_header_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::ArticleHeader, category).await
    }

    pub async fn get_article_inline_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::ArticleInline, category).await
    }

    pub async fn get_article_bottom_ads(&self, category: Option<&str>) -> AdsResult<Vec<AdCreative>> {
        self.placement_ads(Placement::ArticleBottom, category).await
    }

    /// 按广告位配置分派到对应的拉取方法
    pub async fn fetch_for_placement(
        &self,
        config: &PlacementConfig,
        category: Option<&str>,
    ) -> AdsResult<Vec<AdCreative>> {
        match config.fetch {
            FetchMethod::Sidebar => self.get_sidebar_ads(category).await,
            FetchMethod::Inline => self.get_inline_ads(category).await,
            FetchMethod::Header => self.get_header_ads(category).await,
            FetchMethod::BetweenPosts => self.get_between_posts_ads(category).await,
            FetchMethod::ArticleHeader => self.get_article_header_ads(category).await,
            FetchMethod::ArticleInline => self.get_article_inline_ads(category).await,
            FetchMethod::ArticleBottom => self.get_article_bottom_ads(category).await,
            FetchMethod::Generic => {
                self.get_active_ads(category, Some(&config.position), config.limit).await
            }
        }
    }

    /// `POST /api/ads/:id/impression`，响应体忽略
    pub async fn post_impression(&self, ad_id: &str) -> AdsResult<()> {
        let url = self.ad_url(ad_id, &["impression"])?;
        self.send_ignoring_body(self.client.post(url)).await
    }

    /// `POST /api/ads/:id/click`，响应体忽略
    pub async fn post_click(&self, ad_id: &str) -> AdsResult<()> {
        let url = self.ad_url(ad_id, &["click"])?;
        self.send_ignoring_body(self.client.post(url)).await
    }

    /// `GET /api/ads/analytics/detailed?period=`
    pub async fn get_detailed_analytics(&self, period: Period) -> AdsResult<AnalyticsSnapshot> {
        let url = self.url(&["api", "ads", "analytics", "detailed"])?;
        let request = self.client.get(url).query(&[("period", period.as_str())]);
        let envelope: Envelope<AnalyticsSnapshot> = self.send_json(request).await?;
        Ok(envelope.data)
    }

    /// `GET /api/ads/stats`，返回原始统计数据，交给周趋势归一化处理
    pub async fn get_stats(&self) -> AdsResult<Value> {
        let url = self.url(&["api", "ads", "stats"])?;
        let envelope: Envelope<Value> = self.send_json(self.client.get(url)).await?;
        Ok(envelope.data)
    }

    pub async fn list_campaigns(&self) -> AdsResult<Vec<AdCampaign>> {
        let url = self.url(&["api", "ads", "campaigns"])?;
        let envelope: ListEnvelope = self.send_json(self.client.get(url)).await?;
        Ok(decode_records(envelope.data))
    }

    pub async fn get_campaign(&self, id: &str) -> AdsResult<AdCampaign> {
        let url = self.campaign_url(id, &[])?;
        let envelope: Envelope<Value> = self.send_json(self.client.get(url)).await?;
        decode_record(envelope.data)
    }

    pub async fn create_campaign(&self, draft: &CampaignDraft) -> AdsResult<AdCampaign> {
        let url = self.url(&["api", "ads", "campaigns"])?;
        let envelope: Envelope<Value> = self.send_json(self.client.post(url).json(draft)).await?;
        decode_record(envelope.data)
    }

    pub async fn update_campaign(&self, id: &str, draft: &CampaignDraft) -> AdsResult<AdCampaign> {
        let url = self.campaign_url(id, &[])?;
        let envelope: Envelope<Value> = self.send_json(self.client.put(url).json(draft)).await?;
        decode_record(envelope.data)
    }

    /// `PATCH /api/ads/campaigns/:id/status`
    pub async fn set_campaign_status(&self, id: &str, status: AdStatus) -> AdsResult<AdCampaign> {
        let url = self.campaign_url(id, &["status"])?;
        let request = self.client.patch(url).json(&json!({ "status": status }));
        let envelope: Envelope<Value> = self.send_json(request).await?;
        decode_record(envelope.data)
    }

    pub async fn delete_campaign(&self, id: &str) -> AdsResult<()> {
        let url = self.campaign_url(id, &[])?;
        self.send_ignoring_body(self.client.delete(url)).await
    }
}

/// 归一化 + 类型化解码，失败的记录丢弃
fn decode_records<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    normalize_records(records)
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(error = %e, "dropping record that failed to decode");
                None
            }
        })
        .collect()
}

fn decode_record<T: DeserializeOwned>(record: Value) -> AdsResult<T> {
    let record = normalize_record(record).ok_or(AdsError::MalformedRecord)?;
    Ok(serde_json::from_value(record)?)
}

async fn check_status(response: Response) -> AdsResult<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(AdsError::SessionExpired);
    }
    if !status.is_success() {
        let content_type = content_type_of(&response);
        let body = response.text().await.unwrap_or_default();
        // 网关 / 代理的 HTML 错误页（502、504 等）
        if looks_like_html(&content_type, &body) {
            return Err(AdsError::NonJson {
                content_type,
                snippet: snippet(&body),
            });
        }
        return Err(AdsError::Status {
            status: status.as_u16(),
            message: snippet(&body),
        });
    }
    Ok(response)
}

/// 只接受 `application/json`，其余内容类型（例如代理返回的 HTML 错误页）直接报错，不尝试解析
async fn read_json<T: DeserializeOwned>(response: Response) -> AdsResult<T> {
    let content_type = content_type_of(&response);

    if !is_json_content_type(&content_type) {
        let body = response.text().await.unwrap_or_default();
        return Err(AdsError::NonJson {
            content_type,
            snippet: snippet(&body),
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn looks_like_html(content_type: &str, body: &str) -> bool {
    if is_json_content_type(content_type) {
        return false;
    }
    content_type.to_ascii_lowercase().contains("html") || body.trim_start().starts_with('<')
}

pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn snippet(body: &str) -> String {
    body.trim().chars().take(SNIPPET_CHARS).collect()
}
