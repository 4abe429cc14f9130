// src/model/ad.rs

use serde::{Deserialize, Serialize};

use crate::model::analytics::count;

/// 视频素材常见扩展名
const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".ogg", ".mov", ".m4v"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Active,
    Paused,
    Completed,
}

impl AdStatus {
    /// 无法识别的状态按 pending 处理
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" => AdStatus::Approved,
            "rejected" => AdStatus::Rejected,
            "active" => AdStatus::Active,
            "paused" => AdStatus::Paused,
            "completed" => AdStatus::Completed,
            _ => AdStatus::Pending,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// 声明的类型优先；缺失或无法识别时根据 URL 推断
    pub fn resolve(declared: Option<&str>, url: &str) -> Self {
        match declared.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            Some("image") => MediaKind::Image,
            Some("video") => MediaKind::Video,
            _ => Self::from_url(url),
        }
    }

    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        // 去掉 query / fragment 再看扩展名
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) || path.contains("/video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AdMedia {
    pub url: String,
    pub kind: MediaKind,
}

/// **广告创意**（以服务端为准，每次拉取后在客户端缓存）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawAd")]
pub struct AdCreative {
    pub id: String,
    pub title: String,
    pub description: String,
    pub advertiser: String,
    /// 落地页
    pub link: String,
    pub media_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub categories: Vec<String>,
    pub positions: Vec<String>,
    pub impressions: u64,
    pub clicks: u64,
    pub status: AdStatus,
}

/// 服务端原始记录，同一含义的字段可能以多种拼写同时出现
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAd {
    #[serde(default)]
    id: String,
    title: Option<String>,
    description: Option<String>,
    advertiser: Option<String>,
    advertiser_name: Option<String>,
    link: Option<String>,
    target_url: Option<String>,
    url: Option<String>,
    media_url: Option<String>,
    image_url: Option<String>,
    media_type: Option<String>,
    categories: Option<Vec<String>>,
    target_categories: Option<Vec<String>>,
    positions: Option<Vec<String>>,
    target_positions: Option<Vec<String>>,
    impressions: Option<f64>,
    clicks: Option<f64>,
    status: Option<String>,
}

/// 按顺序取第一个非空值
fn first_filled<I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

fn first_list(primary: Option<Vec<String>>, fallback: Option<Vec<String>>) -> Vec<String> {
    match primary {
        Some(list) if !list.is_empty() => list,
        _ => fallback.unwrap_or_default(),
    }
}

impl From<RawAd> for AdCreative {
    fn from(raw: RawAd) -> Self {
        AdCreative {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            advertiser: first_filled([raw.advertiser, raw.advertiser_name]),
            link: first_filled([raw.link, raw.target_url, raw.url]),
            media_url: first_filled([raw.media_url, raw.image_url]),
            media_type: raw.media_type,
            categories: first_list(raw.categories, raw.target_categories),
            positions: first_list(raw.positions, raw.target_positions),
            impressions: count(raw.impressions),
            clicks: count(raw.clicks),
            status: raw.status.as_deref().map(AdStatus::parse).unwrap_or_default(),
        }
    }
}

impl AdCreative {
    pub fn media(&self) -> AdMedia {
        AdMedia {
            url: self.media_url.clone(),
            kind: MediaKind::resolve(self.media_type.as_deref(), &self.media_url),
        }
    }

    /// 点击率（百分比），无曝光时为 0
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64 * 100.0
        }
    }
}
