// src/config/client_config.rs

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::{AdsError, AdsResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
/// 管理端请求的客户端超时
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
/// 关闭按钮在首次渲染后多久出现（产品策略，可配置）
pub const DEFAULT_CLOSE_DELAY_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub close_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            close_delay: Duration::from_secs(DEFAULT_CLOSE_DELAY_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// 从环境变量读取，未设置时使用默认值
    pub fn from_env() -> AdsResult<Self> {
        let base_url: String = try_load("ADS_API_BASE_URL", DEFAULT_BASE_URL)?;
        let timeout_secs: u64 = try_load(
            "ADS_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )?;
        let close_delay_secs: u64 =
            try_load("ADS_CLOSE_DELAY_SECS", &DEFAULT_CLOSE_DELAY_SECS.to_string())?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            close_delay: Duration::from_secs(close_delay_secs),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

}

fn try_load<T: FromStr>(key: &str, default: &str) -> AdsResult<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        AdsError::Config(format!("{key}={raw}: {e}"))
    })
}
