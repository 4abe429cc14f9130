pub mod ad;
pub mod analytics;
pub mod campaign;
pub mod ident;
pub mod placement;

pub use analytics::{AnalyticsSnapshot, Period, WeeklyTrendPoint};
pub use ad::{AdCreative, AdMedia, AdStatus, MediaKind};
pub use campaign::{AdCampaign, CampaignDraft, CampaignOverview};
pub use placement::{BannerSize, FetchMethod, Placement, PlacementConfig};
