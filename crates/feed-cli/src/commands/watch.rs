//! `watch-*` 명령.
//!
//! 설정으로 WebSocket 전송 계층과 스트리밍 코어를 구성하고, 지정한 횟수만큼
//! 업데이트를 기다려 JSON 한 줄씩 출력합니다.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use feed_core::{parse_iso8601, AppConfig};
use feed_exchange::{HollaexStream, StaticMarketResolver, WsTransport};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// 감시 대상 채널.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    /// 호가창
    OrderBook,
    /// 공개 체결
    Trades,
    /// 내 주문
    Orders,
    /// 잔고
    Balance,
}

impl WatchTarget {
    /// 심볼이 반드시 필요한 채널인지 확인.
    pub fn requires_symbol(&self) -> bool {
        matches!(self, WatchTarget::OrderBook | WatchTarget::Trades)
    }

    /// 인증이 필요한 채널인지 확인.
    pub fn is_private(&self) -> bool {
        matches!(self, WatchTarget::Orders | WatchTarget::Balance)
    }
}

/// 감시 명령 설정.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 대상 채널
    pub target: WatchTarget,
    /// 심볼 (예: BTC/USDT 또는 btc-usdt)
    pub symbol: Option<String>,
    /// 호가 레벨 수 또는 최대 레코드 수
    pub limit: Option<usize>,
    /// 이 시각 이후의 레코드만 (epoch 밀리초)
    pub since: Option<i64>,
    /// 출력할 업데이트 수 (0 = 무제한)
    pub count: usize,
}

impl WatchConfig {
    /// 명령 인자를 검증합니다.
    pub fn validate(&self) -> Result<()> {
        if self.target.requires_symbol() && self.symbol.is_none() {
            bail!("--symbol is required for {:?}", self.target);
        }
        Ok(())
    }
}

/// `--since` 값을 epoch 밀리초로 변환합니다.
///
/// 정수(epoch 밀리초) 또는 ISO-8601 문자열을 받습니다.
pub fn parse_since(value: &str) -> Result<i64> {
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    parse_iso8601(value).with_context(|| format!("Invalid --since value: {}", value))
}

/// 설정으로 스트리밍 코어를 만들고 이벤트 처리 태스크를 시작합니다.
pub fn build_stream(config: &AppConfig) -> Result<Arc<HollaexStream>> {
    let resolver = StaticMarketResolver::from_ids(&config.markets);
    info!(markets = resolver.len(), "Market resolver ready");

    let (transport, events) = WsTransport::channel(&config.stream, &HollaexStream::ping_payload());
    let stream = HollaexStream::new(
        config.stream.clone(),
        Arc::new(resolver),
        Arc::new(transport),
    )
    .with_credentials(&config.credentials)
    .context("Invalid credentials")?;

    let stream = Arc::new(stream);
    stream.clone().run(events);
    spawn_error_logger(&stream);
    Ok(stream)
}

/// 전파된 스트림 에러를 로그로 남기는 태스크.
fn spawn_error_logger(stream: &HollaexStream) {
    let mut errors = stream.subscribe_errors();
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(err) if err.is_auth_error() => {
                    error!(error = %err, "Stream authentication failed, check credentials")
                }
                Ok(err) if err.is_fatal() => error!(error = %err, "Stream error"),
                Ok(err) if err.is_retryable() => {
                    warn!(error = %err, "Transient stream error, next watch resubscribes")
                }
                Ok(err) => warn!(error = %err, "Stream error"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Stream error log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// 감시 명령을 실행합니다.
pub async fn run_watch(stream: &HollaexStream, config: &WatchConfig) -> Result<()> {
    config.validate()?;
    let symbol = config.symbol.as_deref();

    let mut received = 0usize;
    while config.count == 0 || received < config.count {
        match config.target {
            WatchTarget::OrderBook => {
                let book = stream
                    .watch_order_book(symbol.unwrap_or_default(), config.limit, None)
                    .await?;
                debug!(
                    best_bid = ?book.best_bid(),
                    best_ask = ?book.best_ask(),
                    spread = ?book.spread(),
                    "Order book update"
                );
                print_json(&book)?;
            }
            WatchTarget::Trades => {
                let trades = stream
                    .watch_trades(symbol.unwrap_or_default(), config.since, config.limit, None)
                    .await?;
                print_json(&trades)?;
            }
            WatchTarget::Orders => {
                let orders = stream
                    .watch_orders(symbol, config.since, config.limit, None)
                    .await?;
                print_json(&orders)?;
            }
            WatchTarget::Balance => {
                let balance = stream.watch_balance(None).await?;
                print_json(&balance)?;
            }
        }
        received += 1;
    }

    info!(received, "Watch finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target: WatchTarget, symbol: Option<&str>) -> WatchConfig {
        WatchConfig {
            target,
            symbol: symbol.map(str::to_string),
            limit: None,
            since: None,
            count: 1,
        }
    }

    #[test]
    fn test_parse_since() {
        assert_eq!(parse_since("1640995200000").unwrap(), 1_640_995_200_000);
        assert_eq!(parse_since("2022-01-01T00:00:00Z").unwrap(), 1_640_995_200_000);
        assert!(parse_since("yesterday").is_err());
    }

    #[test]
    fn test_symbol_required_for_public_channels() {
        assert!(config(WatchTarget::OrderBook, None).validate().is_err());
        assert!(config(WatchTarget::Trades, Some("BTC/USDT")).validate().is_ok());
        assert!(config(WatchTarget::Orders, None).validate().is_ok());
        assert!(config(WatchTarget::Balance, None).validate().is_ok());
    }

    #[test]
    fn test_target_privacy() {
        assert!(WatchTarget::Orders.is_private());
        assert!(!WatchTarget::OrderBook.is_private());
    }

    #[tokio::test]
    async fn test_build_stream_without_credentials() {
        let stream = build_stream(&AppConfig::default()).unwrap();
        let err = stream.watch_balance(None).await.unwrap_err();
        assert!(err.is_auth_error());
    }
}
