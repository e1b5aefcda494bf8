//! 호가창 핸들러.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use feed_core::feed_span;
use serde_json::Value;
use tracing::debug;

use super::{safe_market, Resolution, StreamState};
use crate::parser::{parse_order_book, safe_string};
use crate::topic::{message_hash, Topic};
use crate::traits::MarketResolver;
use crate::waiters::StreamUpdate;

impl StreamState {
    /// 호가창 프레임을 적용합니다.
    ///
    /// 모든 프레임은 전체 스냅샷이며, 기존 호가창이 있으면 제자리에서
    /// 교체(reset)합니다. `orderbook:<marketId>` 대기자를 해제합니다.
    pub fn handle_order_book(
        &mut self,
        frame: &Value,
        resolver: &dyn MarketResolver,
    ) -> Option<Resolution> {
        let Some(market_id) = safe_string(frame, "symbol") else {
            debug!("Order book frame without symbol");
            return None;
        };
        let market = safe_market(resolver, &market_id);
        let _span = feed_span!("order_book", Topic::OrderBook, market.symbol).entered();

        let empty = Value::Null;
        let data = frame.get("data").unwrap_or(&empty);
        let snapshot = parse_order_book(data, &market.symbol);
        let resolution = Resolution::new(vec![message_hash(Topic::OrderBook, Some(&market_id))]);
        let wanted = self.wants_update(&resolution);

        let book = match self.order_books.entry(market.symbol.clone()) {
            Entry::Occupied(entry) => {
                let book = entry.into_mut();
                book.reset(snapshot);
                book
            }
            Entry::Vacant(entry) => entry.insert(snapshot),
        };
        debug!(
            bids = book.bids.len(),
            asks = book.asks.len(),
            "Order book snapshot applied"
        );

        let update = wanted.then(|| StreamUpdate::OrderBook(Arc::new(book.clone())));
        Some(resolution.with_update(update))
    }
}
