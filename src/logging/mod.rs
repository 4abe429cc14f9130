pub mod subscriber;
pub mod tracking_sink;

pub use tracking_sink::{TrackingFailure, TrackingKind, TrackingSink};
