// src/model/placement.rs

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// 页面上的广告位
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Placement {
    Sidebar,
    Inline,
    Header,
    BetweenPosts,
    ArticleHeader,
    ArticleInline,
    ArticleBottom,
}

impl Placement {
    pub const ALL: [Placement; 7] = [
        Placement::Sidebar,
        Placement::Inline,
        Placement::Header,
        Placement::BetweenPosts,
        Placement::ArticleHeader,
        Placement::ArticleInline,
        Placement::ArticleBottom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Sidebar => "sidebar",
            Placement::Inline => "inline",
            Placement::Header => "header",
            Placement::BetweenPosts => "between-posts",
            Placement::ArticleHeader => "article-header",
            Placement::ArticleInline => "article-inline",
            Placement::ArticleBottom => "article-bottom",
        }
    }

    /// **广告位配置表**
    /// 穷举 match，新增枚举值时编译器会强制补齐配置。
    pub fn config(self) -> PlacementConfig {
        let (fetch, limit, size, container_class, sticky) = match self {
            Placement::Sidebar => (FetchMethod::Sidebar, 3, BannerSize::Medium, "ad-sidebar-container", true),
            Placement::Inline => (FetchMethod::Inline, 2, BannerSize::Large, "ad-inline-container", false),
            Placement::Header => (FetchMethod::Header, 2, BannerSize::Leaderboard, "ad-header-container", false),
            Placement::BetweenPosts => (FetchMethod::BetweenPosts, 2, BannerSize::Large, "ad-between-posts-container", false),
            Placement::ArticleHeader => (FetchMethod::ArticleHeader, 2, BannerSize::Leaderboard, "ad-article-header-container", false),
            Placement::ArticleInline => (FetchMethod::ArticleInline, 2, BannerSize::Medium, "ad-article-inline-container", false),
            Placement::ArticleBottom => (FetchMethod::ArticleBottom, 4, BannerSize::Large, "ad-article-bottom-container", false),
        };
        PlacementConfig {
            placement: Some(self),
            fetch,
            position: self.as_str().to_string(),
            limit,
            size,
            container_class: container_class.to_string(),
            sticky,
        }
    }
}

impl TryFrom<&str> for Placement {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "sidebar" => Ok(Placement::Sidebar),
            "inline" => Ok(Placement::Inline),
            "header" => Ok(Placement::Header),
            "between-posts" | "betweenPosts" | "between_posts" => Ok(Placement::BetweenPosts),
            "article-header" | "articleHeader" | "article_header" => Ok(Placement::ArticleHeader),
            "article-inline" | "articleInline" | "article_inline" => Ok(Placement::ArticleInline),
            "article-bottom" | "articleBottom" | "article_bottom" => Ok(Placement::ArticleBottom),
            other => Err(format!("Invalid value for Placement: {}", other)),
        }
    }
}

impl TryFrom<String> for Placement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Placement::try_from(value.as_str())
    }
}

impl From<Placement> for String {
    fn from(placement: Placement) -> Self {
        placement.as_str().to_string()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拉取广告时使用的客户端方法
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Sidebar,
    Inline,
    Header,
    BetweenPosts,
    ArticleHeader,
    ArticleInline,
    ArticleBottom,
    /// 未知广告位：直接调用 `get_active_ads`，位置参数原样透传
    Generic,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BannerSize {
    Small,
    Medium,
    Large,
    Leaderboard,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PlacementConfig {
    pub placement: Option<Placement>,
    pub fetch: FetchMethod,
    pub position: String,
    pub limit: usize,
    pub size: BannerSize,
    pub container_class: String,
    pub sticky: bool,
}

pub const GENERIC_LIMIT: usize = 3;

impl PlacementConfig {
    pub fn generic(position: &str) -> Self {
        Self {
            placement: None,
            fetch: FetchMethod::Generic,
            position: position.trim().to_string(),
            limit: GENERIC_LIMIT,
            size: BannerSize::Medium,
            container_class: "ad-container".to_string(),
            sticky: false,
        }
    }
}

/// 广告位名称 -> 配置；未知名称返回通用配置，不报错
pub fn resolve(name: &str) -> PlacementConfig {
    match Placement::try_from(name) {
        Ok(placement) => placement.config(),
        Err(_) => PlacementConfig::generic(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_placement_has_a_complete_entry() {
        for placement in Placement::ALL {
            let config = placement.config();
            assert_eq!(config.placement, Some(placement));
            assert_ne!(config.fetch, FetchMethod::Generic);
            assert!((2..=4).contains(&config.limit), "{placement}: {}", config.limit);
            assert!(!config.container_class.is_empty());
            assert_eq!(config.position, placement.as_str());
        }
    }

    #[test]
    fn names_round_trip_through_resolver() {
        for placement in Placement::ALL {
            assert_eq!(resolve(placement.as_str()).placement, Some(placement));
        }
        assert_eq!(resolve("betweenPosts").fetch, FetchMethod::BetweenPosts);
    }

    #[test]
    fn only_sidebar_is_sticky() {
        let sticky: Vec<_> = Placement::ALL.iter().filter(|p| p.config().sticky).collect();
        assert_eq!(sticky, vec![&Placement::Sidebar]);
    }

    #[test]
    fn unknown_placement_falls_back_to_generic() {
        let config = resolve("footer-popup");
        assert_eq!(config.fetch, FetchMethod::Generic);
        assert_eq!(config.position, "footer-popup");
        assert_eq!(config.placement, None);
        assert_eq!(config.limit, GENERIC_LIMIT);
    }

    #[test]
    fn serde_uses_kebab_names() {
        let json = serde_json::to_string(&Placement::BetweenPosts).unwrap();
        assert_eq!(json, "\"between-posts\"");
        let back: Placement = serde_json::from_str("\"article-bottom\"").unwrap();
        assert_eq!(back, Placement::ArticleBottom);
    }
}
