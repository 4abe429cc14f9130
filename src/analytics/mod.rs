pub mod fallback;
pub mod service;
pub mod weekly;

pub use service::{AnalyticsService, AnalyticsView};
pub use weekly::{TrendSource, WeeklyPayload, WeeklyTrends};
