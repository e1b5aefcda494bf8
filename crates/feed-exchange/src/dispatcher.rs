//! 수신 프레임 디스패처.
//!
//! 처리 순서:
//! 1. 에러 분류 (인증 에러는 억제, 나머지는 전파)
//! 2. 하트비트 응답(`{"message": "pong"}`) 기록
//! 3. `topic` 필드로 채널 핸들러 선택. 알 수 없는 토픽은 무시
//!
//! 핸들러는 상태 쓰기 잠금 안에서 실행되고, 대기자 해제는 잠금을 푼 뒤에
//! 수행됩니다.

use feed_core::now_millis;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::classifier::{classify, ErrorClassification};
use crate::handlers::Resolution;
use crate::stream::HollaexStream;
use crate::topic::Topic;
use crate::traits::ExchangeResult;

/// 하트비트 응답 내용.
const PONG_MESSAGE: &str = "pong";

impl HollaexStream {
    /// 텍스트 프레임을 디코딩해 처리합니다.
    pub fn handle_text(&self, text: &str) -> ExchangeResult<()> {
        let frame: Value = serde_json::from_str(text)?;
        self.handle_message(&frame)
    }

    /// 디코딩된 프레임을 처리합니다.
    ///
    /// # Errors
    /// 인증 외의 에러 프레임은 분류된 `ExchangeError`로 반환됩니다.
    pub fn handle_message(&self, frame: &Value) -> ExchangeResult<()> {
        match classify(frame) {
            ErrorClassification::Deliver => {}
            ErrorClassification::Suppressed(err) => {
                warn!(error = %err, "Suppressed error frame");
                return Ok(());
            }
            ErrorClassification::Propagate(err) => return Err(err),
        }

        if frame.get("message").and_then(Value::as_str) == Some(PONG_MESSAGE) {
            let now = now_millis();
            *self.last_pong.lock() = Some(now);
            trace!(at = now, "Pong received");
            return Ok(());
        }

        let Some(topic_name) = frame.get("topic").and_then(Value::as_str) else {
            debug!("Frame without topic ignored");
            return Ok(());
        };
        let Ok(topic) = topic_name.parse::<Topic>() else {
            debug!(topic = topic_name, "Unknown topic ignored");
            return Ok(());
        };

        let resolution = {
            let mut state = self.state.write();
            let resolver = self.resolver.as_ref();
            match topic {
                Topic::OrderBook => state.handle_order_book(frame, resolver),
                Topic::Trade => state.handle_trades(frame, resolver),
                Topic::Order => state.handle_order(frame, resolver),
                Topic::Wallet => Some(state.handle_balance(frame, resolver)),
            }
        };

        if let Some(Resolution {
            hashes,
            update: Some(update),
        }) = resolution
        {
            let waiters = self.router.waiters();
            for hash in &hashes {
                waiters.resolve(hash, &update);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use feed_core::StreamConfig;
    use serde_json::json;

    use crate::resolver::StaticMarketResolver;
    use crate::traits::Transport;
    use crate::{ExchangeError, HollaexStream};

    use super::*;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&self, _url: &str, _payload: &Value) -> ExchangeResult<()> {
            Ok(())
        }
    }

    fn stream() -> HollaexStream {
        HollaexStream::new(
            StreamConfig::default(),
            Arc::new(StaticMarketResolver::from_ids(["btc-usdt", "ltc-usdt"])),
            Arc::new(NullTransport),
        )
    }

    #[test]
    fn test_pong_recorded() {
        let stream = stream();
        assert!(stream.last_pong().is_none());
        stream.handle_text(r#"{"message":"pong"}"#).unwrap();
        assert!(stream.last_pong().is_some());
    }

    #[test]
    fn test_auth_error_dropped() {
        let stream = stream();
        stream
            .handle_message(&json!({ "error": "Bearer or HMAC authentication required" }))
            .unwrap();
    }

    #[test]
    fn test_bad_request_propagated() {
        let err = stream()
            .handle_message(&json!({ "error": "Error: wrong input" }))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::BadRequest(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = stream().handle_text("not json").unwrap_err();
        assert!(matches!(err, ExchangeError::ParseError(_)));
    }

    #[test]
    fn test_unknown_topic_ignored() {
        let stream = stream();
        stream
            .handle_message(&json!({ "topic": "ticker", "data": {} }))
            .unwrap();
        stream.handle_message(&json!({ "data": {} })).unwrap();
        assert!(stream.orders().is_empty());
    }

    #[test]
    fn test_topic_routed_to_handler() {
        let stream = stream();
        stream
            .handle_message(&json!({
                "topic": "wallet",
                "data": { "btc_balance": 1, "btc_available": 0.5 }
            }))
            .unwrap();
        assert_eq!(stream.balance().free("BTC"), Some("0.5"));
    }

    #[test]
    fn test_overflowing_amounts_do_not_abort_dispatch() {
        let stream = stream();
        stream
            .handle_message(&json!({
                "topic": "trade",
                "symbol": "btc-usdt",
                "data": [{ "size": 1e10, "price": 1e20, "side": "buy" }]
            }))
            .unwrap();
        stream
            .handle_message(&json!({
                "topic": "order",
                "symbol": "ltc-usdt",
                "data": {
                    "id": "big",
                    "symbol": "ltc-usdt",
                    "side": "buy",
                    "type": "limit",
                    "size": 1e20,
                    "filled": 1e20,
                    "price": 1e20,
                    "status": "filled"
                }
            }))
            .unwrap();

        let trades = stream.trades("BTC/USDT");
        assert_eq!(trades.len(), 1);
        assert!(trades[0].cost.is_none());

        let orders = stream.orders();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].cost.is_none());
        assert_eq!(orders[0].remaining, Some(rust_decimal::Decimal::ZERO));

        stream.handle_message(&json!({ "message": "pong" })).unwrap();
        assert!(stream.last_pong().is_some());
    }
}
