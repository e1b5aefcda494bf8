//! 스트림 감시 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # BTC/USDT 호가창 상위 10 레벨을 5회 출력
//! feed watch-order-book -s BTC/USDT -l 10 -n 5
//!
//! # 체결 스트림 (무제한)
//! feed watch-trades -s btc-usdt -n 0
//!
//! # 내 주문과 잔고 (FEED__CREDENTIALS__API_KEY / API_SECRET 필요)
//! feed watch-orders -s LTC/USDT
//! feed watch-balance
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feed_cli::{build_stream, parse_since, run_watch, WatchConfig, WatchTarget};
use feed_core::{init_logging, AppConfig, LogConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "feed")]
#[command(about = "HollaEx streaming feed CLI - 정규화된 실시간 스트림 감시", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 호가창 스냅샷 감시
    WatchOrderBook {
        /// 심볼 (예: BTC/USDT 또는 btc-usdt)
        #[arg(short, long)]
        symbol: String,

        /// 면당 호가 레벨 수
        #[arg(short, long)]
        limit: Option<usize>,

        /// 출력할 업데이트 수 (0 = 무제한)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// 공개 체결 감시
    WatchTrades {
        /// 심볼
        #[arg(short, long)]
        symbol: String,

        /// 최대 체결 수 (가장 최근 기준)
        #[arg(short, long)]
        limit: Option<usize>,

        /// 시작 시각 (epoch 밀리초 또는 ISO-8601)
        #[arg(long)]
        since: Option<String>,

        /// 출력할 업데이트 수 (0 = 무제한)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// 내 주문 감시 (인증 필요)
    WatchOrders {
        /// 심볼 (생략하면 전체 마켓)
        #[arg(short, long)]
        symbol: Option<String>,

        /// 최대 주문 수 (가장 최근 기준)
        #[arg(short, long)]
        limit: Option<usize>,

        /// 시작 시각 (epoch 밀리초 또는 ISO-8601)
        #[arg(long)]
        since: Option<String>,

        /// 출력할 업데이트 수 (0 = 무제한)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// 잔고 감시 (인증 필요)
    WatchBalance {
        /// 출력할 업데이트 수 (0 = 무제한)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
}

impl Commands {
    fn into_watch_config(self) -> Result<WatchConfig> {
        let config = match self {
            Commands::WatchOrderBook {
                symbol,
                limit,
                count,
            } => WatchConfig {
                target: WatchTarget::OrderBook,
                symbol: Some(symbol),
                limit,
                since: None,
                count,
            },
            Commands::WatchTrades {
                symbol,
                limit,
                since,
                count,
            } => WatchConfig {
                target: WatchTarget::Trades,
                symbol: Some(symbol),
                limit,
                since: since.as_deref().map(parse_since).transpose()?,
                count,
            },
            Commands::WatchOrders {
                symbol,
                limit,
                since,
                count,
            } => WatchConfig {
                target: WatchTarget::Orders,
                symbol,
                limit,
                since: since.as_deref().map(parse_since).transpose()?,
                count,
            },
            Commands::WatchBalance { count } => WatchConfig {
                target: WatchTarget::Balance,
                symbol: None,
                limit: None,
                since: None,
                count,
            },
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 계속 진행
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let watch = cli.command.into_watch_config()?;
    info!(
        channel = ?watch.target,
        symbol = ?watch.symbol,
        private = watch.target.is_private(),
        "Starting watch"
    );

    let stream = build_stream(&config)?;
    run_watch(&stream, &watch).await
}
