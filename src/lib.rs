// src/lib.rs

//! 广告投放客户端：按广告位拉取广告、曝光/点击上报、管理端分析数据兜底与周趋势整理。

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mock_backend;
pub mod model;
pub mod placement;
pub mod tracking;

pub use client::AdClient;
pub use config::ClientConfig;
pub use error::{AdsError, AdsResult};
