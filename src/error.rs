// src/error.rs

use thiserror::Error;

pub type AdsResult<T> = Result<T, AdsError>;

/// 广告服务调用的错误分类
#[derive(Error, Debug)]
pub enum AdsError {
    #[error("request timed out after {0} ms")]
    Timeout(u128),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401：会话过期，需要调用方引导重新登录
    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// 通常是反向代理配置错误，返回了 HTML 错误页
    #[error("expected application/json but got `{content_type}` (proxy or server misconfiguration?): {snippet}")]
    NonJson { content_type: String, snippet: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// 单条记录接口返回了缺失或占位 ID 的记录
    #[error("backend returned a record without a usable id")]
    MalformedRecord,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AdsError {
    /// 指标/日志中使用的简短错误类型
    pub fn kind(&self) -> &'static str {
        match self {
            AdsError::Timeout(_) => "timeout",
            AdsError::Network(_) => "network",
            AdsError::SessionExpired => "session_expired",
            AdsError::Status { .. } => "status",
            AdsError::NonJson { .. } => "non_json",
            AdsError::Decode(_) => "decode",
            AdsError::MalformedRecord => "malformed_record",
            AdsError::InvalidUrl(_) => "invalid_url",
            AdsError::Config(_) => "config",
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, AdsError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_message_is_diagnosable() {
        let err = AdsError::NonJson {
            content_type: "text/html".to_string(),
            snippet: "<!DOCTYPE html>".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("text/html"));
        assert!(msg.contains("misconfiguration"));
        assert_eq!(err.kind(), "non_json");
    }

    #[test]
    fn session_expired_is_distinct() {
        assert!(AdsError::SessionExpired.is_session_expired());
        assert!(!AdsError::Timeout(15_000).is_session_expired());
    }
}
