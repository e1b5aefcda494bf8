//! 주문 핸들러.

use std::sync::Arc;

use feed_core::feed_span;
use serde_json::Value;
use tracing::{debug, warn};

use super::{safe_market, Resolution, StreamState};
use crate::cache::OrderCache;
use crate::parser::{parse_order, safe_string};
use crate::topic::{message_hash, Topic};
use crate::traits::MarketResolver;
use crate::waiters::StreamUpdate;

/// 모든 주문을 기다리는 해시.
const ALL_ORDERS_HASH: &str = "order";

/// 주문 데이터가 비어 있는지 확인합니다 (없음, null, `{}`, `[]`).
fn is_empty_payload(data: Option<&Value>) -> bool {
    match data {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

impl StreamState {
    /// 주문 프레임을 적용합니다.
    ///
    /// 빈 데이터는 무시하며 어떤 대기자도 해제하지 않습니다. 그 외에는 전역
    /// 주문 캐시에 (심볼, ID)로 upsert 하고 전체 주문, 토픽, 마켓별 해시를
    /// 해제합니다.
    pub fn handle_order(
        &mut self,
        frame: &Value,
        resolver: &dyn MarketResolver,
    ) -> Option<Resolution> {
        let data = frame.get("data");
        if is_empty_payload(data) {
            debug!("Empty order payload ignored");
            return None;
        }
        let data = data?;

        let frame_market_id = safe_string(frame, "symbol");
        let order_market_id = safe_string(data, "symbol").or_else(|| frame_market_id.clone());
        let market = match order_market_id.as_deref() {
            Some(id) => safe_market(resolver, id),
            None => {
                warn!("Order frame without symbol");
                return None;
            }
        };
        let _span = feed_span!("order", Topic::Order, market.symbol).entered();

        let order = match parse_order(data, &market) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Failed to parse order");
                return None;
            }
        };

        let mut hashes = vec![
            ALL_ORDERS_HASH.to_string(),
            message_hash(Topic::Order, None),
        ];
        if let Some(id) = frame_market_id.as_deref() {
            hashes.push(message_hash(Topic::Order, Some(id)));
        }
        let resolution = Resolution::new(hashes);
        let wanted = self.wants_update(&resolution);

        let limit = self.orders_limit;
        let cache = self.orders.get_or_insert_with(|| OrderCache::new(limit));
        let order_id = order.id.clone();
        let replaced = cache.upsert(order);
        debug!(order_id = %order_id, replaced, cached = cache.len(), "Order upserted");

        let update = wanted.then(|| StreamUpdate::Orders(Arc::new(cache.to_vec())));
        Some(resolution.with_update(update))
    }
}
