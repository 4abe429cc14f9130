// src/logging/subscriber.rs

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::{AdsError, AdsResult};

/// 非阻塞写入线程的 guard，进程存活期间不能释放
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

pub const LOG_FILE_NAME: &str = "ad_pipeline.json";

/// 初始化全局 tracing 日志
/// - 指定 `log_dir` 时按小时滚动写 JSON 文件
/// - 否则 JSON 输出到 stderr
pub fn init(log_dir: Option<&str>) -> AdsResult<()> {
    let (writer, guard) = match log_dir {
        Some(dir) => tracing_appender::non_blocking(rolling::hourly(dir, LOG_FILE_NAME)),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().json().with_writer(writer));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AdsError::Config(format!("unable to set global tracing subscriber: {}", e)))?;

    // 重复初始化在上面已经报错，这里只会成功一次
    let _ = LOG_GUARD.set(guard);
    Ok(())
}
