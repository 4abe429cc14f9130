// src/analytics/weekly.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::analytics::{count, ratio, WeeklyTrendPoint};

/// 无周数据时的占位趋势（仅用于空状态展示，不是真实数据）
pub const PLACEHOLDER_VALUES: [f64; 4] = [0.05, 0.08, 0.12, 0.18];

/// 超过该位置的条目不再使用 "N Weeks Ago"
const MAX_RELATIVE_WEEKS: usize = 4;

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawWeek {
    #[serde(default, alias = "label", alias = "weekLabel")]
    pub week: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub clicks: Option<f64>,
    #[serde(default)]
    pub impressions: Option<f64>,
    #[serde(default)]
    pub ctr: Option<f64>,
}

/// 旧接口的 `weeklyRevenue` 有时直接是数字数组
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWeekEntry {
    Amount(f64),
    Record(RawWeek),
}

impl RawWeekEntry {
    fn into_week(self) -> RawWeek {
        match self {
            RawWeekEntry::Amount(revenue) => RawWeek {
                revenue: Some(revenue),
                ..RawWeek::default()
            },
            RawWeekEntry::Record(week) => week,
        }
    }
}

/// **周数据的两种后端格式**，在边界处一次性解析
#[derive(Debug, Clone, PartialEq)]
pub enum WeeklyPayload {
    /// `weeklyAnalytics.weeklyTrends`
    Modern(Vec<RawWeek>),
    /// `weeklyRevenue`
    Legacy(Vec<RawWeek>),
    Absent,
}

impl WeeklyPayload {
    pub fn from_stats(stats: &Value) -> Self {
        if let Some(weeks) = stats
            .pointer("/weeklyAnalytics/weeklyTrends")
            .and_then(Value::as_array)
            .map(|entries| parse_weeks(entries))
            .filter(|weeks| !weeks.is_empty())
        {
            return WeeklyPayload::Modern(weeks);
        }
        if let Some(weeks) = stats
            .get("weeklyRevenue")
            .and_then(Value::as_array)
            .map(|entries| parse_weeks(entries))
            .filter(|weeks| !weeks.is_empty())
        {
            return WeeklyPayload::Legacy(weeks);
        }
        WeeklyPayload::Absent
    }
}

/// 每个输入条目对应一个输出，标签按原数组长度计算
fn parse_weeks(entries: &[Value]) -> Vec<RawWeek> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| match serde_json::from_value::<RawWeekEntry>(entry.clone()) {
            Ok(entry) => entry.into_week(),
            Err(e) => {
                warn!(index, error = %e, "unreadable weekly entry, counting it as zero");
                RawWeek::default()
            }
        })
        .collect()
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendSource {
    Modern,
    Legacy,
    /// 占位数据，调用方需要在界面上标注
    Placeholder,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrends {
    pub points: Vec<WeeklyTrendPoint>,
    pub source: TrendSource,
}

impl WeeklyTrends {
    pub fn is_placeholder(&self) -> bool {
        self.source == TrendSource::Placeholder
    }
}

/// 按距离数组末尾的位置生成相对标签
pub fn relative_label(index: usize, len: usize, raw: Option<&str>) -> String {
    let from_end = len - 1 - index;
    match from_end {
        0 => "This Week".to_string(),
        1 => "Last Week".to_string(),
        n if n <= MAX_RELATIVE_WEEKS => format!("{} Weeks Ago", n),
        _ => match raw.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => raw.to_string(),
            None => format!("Week {}", index + 1),
        },
    }
}

pub fn normalize(payload: WeeklyPayload) -> WeeklyTrends {
    let (weeks, source) = match payload {
        WeeklyPayload::Modern(weeks) => (weeks, TrendSource::Modern),
        WeeklyPayload::Legacy(weeks) => (weeks, TrendSource::Legacy),
        WeeklyPayload::Absent => {
            debug!("no weekly analytics in stats payload, using placeholder trend");
            return placeholder();
        }
    };

    let len = weeks.len();
    let points = weeks
        .into_iter()
        .enumerate()
        .map(|(index, week)| {
            let clicks = count(week.clicks);
            let impressions = count(week.impressions);
            let ctr = week
                .ctr
                .unwrap_or_else(|| ratio(clicks as f64, impressions as f64) * 100.0);
            WeeklyTrendPoint {
                label: relative_label(index, len, week.week.as_deref()),
                revenue: week.revenue.unwrap_or_default(),
                clicks,
                impressions,
                ctr,
                is_current_week: index + 1 == len,
            }
        })
        .collect();

    WeeklyTrends { points, source }
}

pub fn normalize_stats(stats: &Value) -> WeeklyTrends {
    normalize(WeeklyPayload::from_stats(stats))
}

pub fn placeholder() -> WeeklyTrends {
    let len = PLACEHOLDER_VALUES.len();
    let points = PLACEHOLDER_VALUES
        .iter()
        .enumerate()
        .map(|(index, &value)| WeeklyTrendPoint {
            label: relative_label(index, len, None),
            revenue: value,
            clicks: 0,
            impressions: 0,
            ctr: 0.0,
            is_current_week: index + 1 == len,
        })
        .collect();
    WeeklyTrends {
        points,
        source: TrendSource::Placeholder,
    }
}
