// src/main.rs

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use tokio::signal;
use tracing::{error, info};

use ad_pipeline::analytics::AnalyticsService;
use ad_pipeline::logging::{subscriber, TrackingSink};
use ad_pipeline::mock_backend::MockBackend;
use ad_pipeline::model::Period;
use ad_pipeline::placement::{AdSlot, SlotSettings};
use ad_pipeline::tracking::Tracker;
use ad_pipeline::{AdClient, AdsResult, ClientConfig};

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "Ad placement client with impression tracking and analytics fallback")]
struct CliArgs {
    /// 后端地址，默认读取 ADS_API_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
    /// 请求超时（秒）
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// 日志目录，不指定则输出到 stderr
    #[arg(long)]
    log_dir: Option<String>,
    /// 在本进程内启动 mock 后端并连接它
    #[arg(long, default_value_t = false)]
    mock: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 只运行 mock 后端，直到 Ctrl-C
    ServeMock {
        #[arg(short, long, default_value_t = 9001)]
        port: u16,
    },
    #[command(flatten)]
    Client(ClientCommand),
}

/// 需要连接后端的命令
#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// 拉取单个广告位的广告
    Ads {
        placement: String,
        #[arg(long)]
        category: Option<String>,
        /// 渲染后关闭的广告 ID
        #[arg(long)]
        dismiss: Vec<String>,
        /// 模拟点击某条广告
        #[arg(long)]
        click: Option<String>,
    },
    /// 并发加载一个页面上的多个广告位
    Page {
        #[arg(long)]
        category: Option<String>,
        #[arg(default_values_t = vec!["header".to_string(), "sidebar".to_string(), "between-posts".to_string()])]
        placements: Vec<String>,
    },
    /// 详细分析数据（失败时使用兜底数据）
    Analytics {
        #[arg(long, default_value = "7d")]
        period: String,
    },
    /// 周趋势
    Weekly,
    /// 广告活动列表
    Campaigns,
}

fn print_json<T: Serialize>(value: &T) -> AdsResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve_mock(port: u16) -> AdsResult<()> {
    let backend = Arc::new(MockBackend::with_sample_data());
    let (addr, server) = backend.spawn(&format!("0.0.0.0:{}", port)).await?;
    info!("Mock ad backend listening on {}", addr);
    tokio::select! {
        _ = signal::ctrl_c() => info!("Shutting down mock backend..."),
        _ = server => error!("mock backend exited"),
    }
    Ok(())
}

async fn run(args: CliArgs) -> AdsResult<()> {
    let command = match args.command {
        Command::ServeMock { port } => return serve_mock(port).await,
        Command::Client(command) => command,
    };

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    // mock 后端在后台任务中运行，进程退出时随运行时一起结束
    if args.mock {
        let backend = Arc::new(MockBackend::with_sample_data());
        let (addr, _server) = backend.spawn("127.0.0.1:0").await?;
        config.base_url = format!("http://{}", addr);
    }

    let client = Arc::new(AdClient::new(config.clone())?);
    let sink = TrackingSink::with_defaults();
    let tracker = Tracker::new(Arc::clone(&client), sink.clone());
    let settings = SlotSettings::from(&config);

    match command {
        ClientCommand::Ads { placement, category, dismiss, click } => {
            let mut slot = AdSlot::new(&placement, category.as_deref(), Arc::clone(&client), tracker, settings);
            slot.load().await;
            for id in &dismiss {
                slot.dismiss(id);
            }
            if let Some(id) = click {
                match slot.click(&id) {
                    Some(link) => info!(ad_id = %id, %link, "navigating to advertiser"),
                    None => info!(ad_id = %id, "ad not clickable"),
                }
            }
            print_json(&slot.view_at(Instant::now()))?;
            slot.flush_tracking().await;
        }
        ClientCommand::Page { category, placements } => {
            let mut slots: Vec<AdSlot> = placements
                .iter()
                .map(|p| AdSlot::new(p, category.as_deref(), Arc::clone(&client), tracker.clone(), settings))
                .collect();
            // 每个广告位独立请求，不合并
            join_all(slots.iter_mut().map(|slot| slot.load())).await;
            let now = Instant::now();
            let views: Vec<_> = slots.iter().map(|slot| slot.view_at(now)).collect();
            print_json(&views)?;
            for slot in slots.iter_mut() {
                slot.flush_tracking().await;
            }
        }
        ClientCommand::Analytics { period } => {
            let service = AnalyticsService::new(Arc::clone(&client));
            let view = service.load(Period::parse(&period)).await;
            if view.session_expired {
                error!("session expired, please sign in again");
            }
            print_json(&view)?;
        }
        ClientCommand::Weekly => {
            let service = AnalyticsService::new(Arc::clone(&client));
            print_json(&service.load_weekly_trends().await)?;
        }
        ClientCommand::Campaigns => {
            let now = Utc::now();
            let campaigns = client.list_campaigns().await?;
            let overviews: Vec<_> = campaigns.iter().map(|c| c.overview(now)).collect();
            print_json(&overviews)?;
        }
    }

    if sink.failure_count() > 0 {
        info!(failures = sink.failure_count(), "some tracking calls failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = subscriber::init(args.log_dir.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error_kind = e.kind(), error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
