//! 제한 용량 캐시.
//!
//! - `TradeCache`: 마켓별 체결 기록. 삽입 순서 유지, 용량 초과 시 가장 오래된
//!   항목부터 제거(FIFO).
//! - `OrderCache`: 모든 마켓의 주문을 하나로 보관. (심볼, ID)로 upsert 하며
//!   갱신된 주문은 가장 최근 위치로 이동합니다.

use std::collections::VecDeque;

use feed_core::{Order, Trade};

/// 기본 캐시 용량.
pub const DEFAULT_CACHE_LIMIT: usize = 1000;

/// 타임스탬프(epoch 밀리초)를 가진 레코드.
pub trait Timestamped {
    /// 레코드 시각.
    fn timestamp(&self) -> Option<i64>;
}

impl Timestamped for Trade {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

impl Timestamped for Order {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// 마켓별 체결 캐시.
#[derive(Debug, Clone)]
pub struct TradeCache {
    capacity: usize,
    items: VecDeque<Trade>,
}

impl TradeCache {
    /// 새 캐시를 생성합니다. 용량은 최소 1입니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(DEFAULT_CACHE_LIMIT)),
        }
    }

    /// 체결을 추가합니다. 용량을 넘으면 가장 오래된 체결을 버립니다.
    pub fn append(&mut self, trade: Trade) {
        self.items.push_back(trade);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// 여러 체결을 순서대로 추가합니다.
    pub fn extend<I: IntoIterator<Item = Trade>>(&mut self, trades: I) {
        for trade in trades {
            self.append(trade);
        }
    }

    /// 캐시 용량.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 보관 중인 체결 수.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 오래된 순서의 반복자.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.items.iter()
    }

    /// 오래된 순서의 사본.
    pub fn to_vec(&self) -> Vec<Trade> {
        self.items.iter().cloned().collect()
    }
}

/// 전 마켓 주문 캐시.
#[derive(Debug, Clone)]
pub struct OrderCache {
    capacity: usize,
    items: VecDeque<Order>,
}

impl OrderCache {
    /// 새 캐시를 생성합니다. 용량은 최소 1입니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(DEFAULT_CACHE_LIMIT)),
        }
    }

    /// 주문을 삽입하거나 같은 (심볼, ID)의 기존 주문을 대체합니다.
    ///
    /// 기존 주문을 대체했으면 `true`.
    pub fn upsert(&mut self, order: Order) -> bool {
        let existing = self
            .items
            .iter()
            .position(|o| o.key() == order.key());
        let replaced = match existing {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        };

        self.items.push_back(order);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        replaced
    }

    /// (심볼, ID)로 주문을 조회합니다.
    pub fn get(&self, symbol: &str, id: &str) -> Option<&Order> {
        self.items.iter().find(|o| o.key() == (symbol, id))
    }

    /// 캐시 용량.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 보관 중인 주문 수.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 오래된 순서의 반복자.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.items.iter()
    }

    /// 오래된 순서의 사본.
    pub fn to_vec(&self) -> Vec<Order> {
        self.items.iter().cloned().collect()
    }
}

/// `since` 이후 레코드 중 가장 최근 `limit`개를 반환합니다.
///
/// `since`가 주어지면 타임스탬프가 없는 레코드는 제외됩니다.
/// 입력 순서(오래된 순)는 유지됩니다.
pub fn filter_by_since_limit<T: Timestamped + Clone>(
    items: &[T],
    since: Option<i64>,
    limit: Option<usize>,
) -> Vec<T> {
    let mut result: Vec<T> = match since {
        Some(since_ts) => items
            .iter()
            .filter(|item| item.timestamp().is_some_and(|ts| ts >= since_ts))
            .cloned()
            .collect(),
        None => items.to_vec(),
    };

    if let Some(limit_size) = limit {
        if result.len() > limit_size {
            result = result.split_off(result.len() - limit_size);
        }
    }

    result
}

/// 심볼 필터를 적용한 뒤 `filter_by_since_limit`을 수행합니다.
pub fn filter_orders(
    orders: &[Order],
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<usize>,
) -> Vec<Order> {
    match symbol {
        Some(sym) => {
            let matching: Vec<Order> = orders.iter().filter(|o| o.symbol == sym).cloned().collect();
            filter_by_since_limit(&matching, since, limit)
        }
        None => filter_by_since_limit(orders, since, limit),
    }
}
