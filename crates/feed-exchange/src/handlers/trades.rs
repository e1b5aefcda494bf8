//! 체결 핸들러.

use std::sync::Arc;

use feed_core::feed_span;
use serde_json::Value;
use tracing::debug;

use super::{safe_market, Resolution, StreamState};
use crate::cache::TradeCache;
use crate::parser::{parse_trades, safe_string};
use crate::topic::{message_hash, Topic};
use crate::traits::MarketResolver;
use crate::waiters::StreamUpdate;

impl StreamState {
    /// 체결 프레임을 적용합니다.
    ///
    /// 마켓 체결 캐시가 없으면 만들고, 파싱된 체결을 순서대로 추가합니다.
    /// `trade:<marketId>`와 `trade` 대기자를 모두 해제합니다.
    pub fn handle_trades(
        &mut self,
        frame: &Value,
        resolver: &dyn MarketResolver,
    ) -> Option<Resolution> {
        let Some(market_id) = safe_string(frame, "symbol") else {
            debug!("Trade frame without symbol");
            return None;
        };
        let market = safe_market(resolver, &market_id);
        let _span = feed_span!("trades", Topic::Trade, market.symbol).entered();

        let parsed = parse_trades(frame.get("data"), &market);
        let received = parsed.len();
        let resolution = Resolution::new(vec![
            message_hash(Topic::Trade, Some(&market_id)),
            message_hash(Topic::Trade, None),
        ]);
        let wanted = self.wants_update(&resolution);

        let limit = self.trades_limit;
        let cache = self
            .trades
            .entry(market.symbol.clone())
            .or_insert_with(|| TradeCache::new(limit));
        cache.extend(parsed);
        debug!(received, cached = cache.len(), "Trades appended");

        let update = wanted.then(|| StreamUpdate::Trades(Arc::new(cache.to_vec())));
        Some(resolution.with_update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticMarketResolver;
    use serde_json::json;

    fn trade_frame(prices: &[u32]) -> Value {
        let data: Vec<Value> = prices
            .iter()
            .map(|p| {
                json!({
                    "size": 0.1,
                    "price": p,
                    "side": "sell",
                    "timestamp": "2022-04-11T09:40:10.881Z"
                })
            })
            .collect();
        json!({ "topic": "trade", "action": "insert", "symbol": "btc-usdt", "data": data })
    }

    #[test]
    fn test_trades_resolve_market_and_topic_hashes() {
        let resolver = StaticMarketResolver::from_ids(["btc-usdt"]);
        let mut state = StreamState::default();

        let resolution = state.handle_trades(&trade_frame(&[1, 2]), &resolver).unwrap();
        assert_eq!(resolution.hashes, vec!["trade:btc-usdt", "trade"]);
        assert_eq!(state.trades("BTC/USDT").len(), 2);
    }

    #[test]
    fn test_trade_cache_capacity() {
        let resolver = StaticMarketResolver::from_ids(["btc-usdt"]);
        let mut state = StreamState::new(3, 10);

        state.handle_trades(&trade_frame(&[1, 2]), &resolver);
        state.handle_trades(&trade_frame(&[3, 4, 5]), &resolver);

        let prices: Vec<String> = state
            .trades("BTC/USDT")
            .iter()
            .map(|t| t.price.to_string())
            .collect();
        assert_eq!(prices, vec!["3", "4", "5"]);
        assert_eq!(state.trade_cache("BTC/USDT").unwrap().capacity(), 3);
    }

    #[test]
    fn test_missing_data_creates_empty_cache() {
        let resolver = StaticMarketResolver::from_ids(["btc-usdt"]);
        let mut state = StreamState::default();

        let resolution = state
            .handle_trades(&json!({ "topic": "trade", "symbol": "btc-usdt" }), &resolver)
            .unwrap();
        assert!(matches!(resolution.update, Some(StreamUpdate::Trades(ref t)) if t.is_empty()));
        assert!(state.trade_cache("BTC/USDT").is_some());
    }
}
