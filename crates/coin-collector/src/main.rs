//! Standalone collector CLI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use coin_collector::{Collector, CollectorError, Scheduler};
use coin_core::{init_logging, AppConfig, DEFAULT_CONFIG_PATH};
use coin_data::open_store;

#[derive(Parser)]
#[command(name = "coin-collector")]
#[command(about = "CoinWatch listing collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 로그 레벨 (설정 파일보다 우선)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 시세 목록을 한 번 수집하고 등록된 종목의 스냅샷 저장
    Collect,

    /// 페이지의 종목을 등록하고 첫 스냅샷 저장
    SyncInstruments,

    /// 데몬 모드: 주기적으로 수집 (Ctrl+C로 종료)
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config).map_err(|e| CollectorError::Config(e.to_string()))?;

    let mut log_settings = config.logging.clone();
    if let Some(level) = cli.log_level {
        log_settings.level = level;
    }
    init_logging(&log_settings)?;

    tracing::info!("CoinWatch Collector 시작");

    let store = open_store(&config.database).await?;
    tracing::info!(backend = store.backend(), "저장소 준비 완료");

    let collector = Arc::new(Collector::new(config.scraper.clone(), store)?);

    match cli.command {
        Commands::Collect => {
            let outcome = collector.collect_once().await?;
            outcome.stats.log_summary("시세 수집");
        }
        Commands::SyncInstruments => {
            let outcome = collector.sync_instruments().await?;
            outcome.stats.log_summary("종목 동기화");
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.scheduler.interval().as_secs() / 60
            );

            let scheduler = Arc::new(Scheduler::from_config(collector, &config.scheduler));
            scheduler.start();

            tokio::signal::ctrl_c().await?;
            tracing::info!("종료 신호 수신, 데몬 종료 중...");

            scheduler.stop().await;
        }
    }

    tracing::info!("CoinWatch Collector 종료");

    Ok(())
}
