//! 채널 핸들러와 스트림 상태.
//!
//! 각 핸들러는 토픽 하나의 조정 로직을 소유합니다. 핸들러는 `StreamState`를
//! 변경한 뒤 해제할 해시 목록과 업데이트(`Resolution`)를 돌려주며, 대기자
//! 해제는 호출자가 상태 잠금을 푼 뒤에 수행합니다. 대기자 레지스트리가
//! 연결되어 있으면 해시에 대기자가 없을 때 업데이트 스냅샷을 만들지 않습니다.

mod balance;
mod order_book;
mod orders;
mod trades;

use std::collections::HashMap;
use std::sync::Arc;

use feed_core::{Balance, MarketRef, Order, OrderBook, StreamConfig, Trade};

use crate::cache::{OrderCache, TradeCache};
use crate::traits::MarketResolver;
use crate::waiters::{StreamUpdate, WaiterRegistry};

/// 핸들러 처리 결과: 해제할 해시와 전달할 업데이트.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// 해제할 구독 해시 (중복 없음)
    pub hashes: Vec<String>,
    /// 대기자에게 전달할 업데이트. 대기자가 없으면 `None`.
    pub update: Option<StreamUpdate>,
}

impl Resolution {
    fn new(hashes: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if !unique.contains(&hash) {
                unique.push(hash);
            }
        }
        Self {
            hashes: unique,
            update: None,
        }
    }

    fn with_update(mut self, update: Option<StreamUpdate>) -> Self {
        self.update = update;
        self
    }
}

/// 코어 인스턴스 하나가 소유하는 스트림 상태.
///
/// 모든 변경은 채널 핸들러를 통해서만 일어납니다.
#[derive(Debug)]
pub struct StreamState {
    order_books: HashMap<String, OrderBook>,
    trades: HashMap<String, TradeCache>,
    orders: Option<OrderCache>,
    balance: Balance,
    trades_limit: usize,
    orders_limit: usize,
    waiters: Option<Arc<WaiterRegistry>>,
}

impl StreamState {
    /// 캐시 용량을 지정해 빈 상태를 생성합니다.
    pub fn new(trades_limit: usize, orders_limit: usize) -> Self {
        Self {
            order_books: HashMap::new(),
            trades: HashMap::new(),
            orders: None,
            balance: Balance::new(),
            trades_limit,
            orders_limit,
            waiters: None,
        }
    }

    /// 대기자 레지스트리를 연결합니다.
    pub fn with_waiters(mut self, waiters: Arc<WaiterRegistry>) -> Self {
        self.waiters = Some(waiters);
        self
    }

    /// 해시에 대기자가 있어 업데이트를 만들어야 하는지 확인.
    fn wants_update(&self, resolution: &Resolution) -> bool {
        self.waiters
            .as_ref()
            .map_or(true, |waiters| waiters.has_pending(&resolution.hashes))
    }

    /// 스트림 설정의 캐시 용량으로 상태를 생성합니다.
    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.trades_limit, config.orders_limit)
    }

    /// 심볼의 현재 호가창.
    pub fn order_book(&self, symbol: &str) -> Option<&OrderBook> {
        self.order_books.get(symbol)
    }

    /// 심볼의 체결 캐시.
    pub fn trade_cache(&self, symbol: &str) -> Option<&TradeCache> {
        self.trades.get(symbol)
    }

    /// 심볼의 체결 목록 사본.
    pub fn trades(&self, symbol: &str) -> Vec<Trade> {
        self.trades.get(symbol).map(TradeCache::to_vec).unwrap_or_default()
    }

    /// 주문 캐시. 첫 주문 메시지 전에는 `None`.
    pub fn order_cache(&self) -> Option<&OrderCache> {
        self.orders.as_ref()
    }

    /// 주문 목록 사본.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.as_ref().map(OrderCache::to_vec).unwrap_or_default()
    }

    /// 현재 잔고.
    pub fn balance(&self) -> &Balance {
        &self.balance
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::from_config(&StreamConfig::default())
    }
}

/// 와이어 식별자로 마켓을 찾고, 없으면 식별자를 그대로 심볼로 쓰는 마켓을
/// 반환합니다.
pub fn safe_market(resolver: &dyn MarketResolver, market_id: &str) -> MarketRef {
    resolver
        .resolve_market(market_id)
        .unwrap_or_else(|| MarketRef::unknown(market_id))
}
