// src/model/campaign.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ad::{AdCreative, AdStatus};

/// 管理后台列表中的广告活动（在创意基础上增加预算与投放周期）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdCampaign {
    #[serde(flatten)]
    pub creative: AdCreative,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl AdCampaign {
    pub fn id(&self) -> &str {
        &self.creative.id
    }

    /// 仅用于展示，`spent <= budget` 客户端不做强制
    pub fn remaining_budget(&self) -> f64 {
        (self.budget - self.spent).max(0.0)
    }

    pub fn is_overspent(&self) -> bool {
        self.spent > self.budget
    }

    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date.map_or(true, |s| s <= now);
        let not_ended = self.end_date.map_or(true, |e| now <= e);
        self.creative.status == AdStatus::Active && started && not_ended
    }

    pub fn overview(&self, now: DateTime<Utc>) -> CampaignOverview<'_> {
        CampaignOverview {
            campaign: self,
            running: self.is_running_at(now),
            remaining_budget: self.remaining_budget(),
            overspent: self.is_overspent(),
        }
    }
}

/// 管理后台列表行：原始活动数据加上按当前时间计算的状态
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignOverview<'a> {
    #[serde(flatten)]
    pub campaign: &'a AdCampaign,
    pub running: bool,
    pub remaining_budget: f64,
    pub overspent: bool,
}

/// 创建 / 更新广告活动的请求体
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub advertiser: String,
    pub link: String,
    #[serde(default)]
    pub media_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub positions: Vec<String>,
    pub budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn campaign(budget: f64, spent: f64) -> AdCampaign {
        serde_json::from_value(json!({
            "id": "c1",
            "title": "Spring sale",
            "status": "active",
            "budget": budget,
            "spent": spent,
            "startDate": "2026-01-01T00:00:00Z",
            "endDate": "2026-02-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn flattens_creative_fields() {
        let c = campaign(500.0, 120.5);
        assert_eq!(c.id(), "c1");
        assert_eq!(c.creative.title, "Spring sale");
        assert!((c.remaining_budget() - 379.5).abs() < 1e-9);
        assert!(!c.is_overspent());
    }

    #[test]
    fn overspend_is_reported_not_rejected() {
        let c = campaign(100.0, 130.0);
        assert!(c.is_overspent());
        assert_eq!(c.remaining_budget(), 0.0);
    }

    #[test]
    fn running_window() {
        let c = campaign(100.0, 0.0);
        let inside = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert!(c.is_running_at(inside));
        assert!(!c.is_running_at(after));
    }

    #[test]
    fn overview_reports_window_and_budget() {
        let c = campaign(100.0, 130.0);
        let inside = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let row = serde_json::to_value(c.overview(inside)).unwrap();
        assert_eq!(row["id"], "c1");
        assert_eq!(row["running"], true);
        assert_eq!(row["overspent"], true);
        assert_eq!(row["remainingBudget"], 0.0);

        let paused: AdCampaign = serde_json::from_value(json!({"id": "c2", "status": "paused"})).unwrap();
        assert!(!paused.overview(inside).running);
    }
}
