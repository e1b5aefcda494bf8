//! 호가창 엔티티.
//!
//! 이 피드의 호가창은 병합(diff) 방식이 아니라 스냅샷 교체 방식으로
//! 갱신됩니다. 수신한 모든 메시지는 전체 스냅샷으로 취급되어 이전 레벨을
//! 전부 대체합니다.

use crate::types::{millis_to_datetime, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 호가창 가격 레벨.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// 가격
    pub price: Price,
    /// 수량
    pub quantity: Quantity,
}

impl OrderBookLevel {
    /// 새 가격 레벨을 생성합니다.
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

/// 호가창 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// 정규 심볼
    pub symbol: String,
    /// 매수 호가 - 가격 내림차순 정렬
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 - 가격 오름차순 정렬
    pub asks: Vec<OrderBookLevel>,
    /// 스냅샷 타임스탬프 (epoch 밀리초)
    pub timestamp: Option<i64>,
    /// 시퀀스 번호 (거래소가 제공하는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

impl OrderBook {
    /// 빈 호가창을 생성합니다.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp: None,
            nonce: None,
        }
    }

    /// 레벨 목록으로 스냅샷을 생성합니다. 레벨은 정렬됩니다.
    pub fn snapshot(
        symbol: impl Into<String>,
        bids: Vec<OrderBookLevel>,
        asks: Vec<OrderBookLevel>,
        timestamp: Option<i64>,
    ) -> Self {
        let mut book = Self {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
            nonce: None,
        };
        book.sort_levels();
        book
    }

    /// 내용을 주어진 스냅샷으로 완전히 교체합니다.
    ///
    /// 인스턴스 자체는 유지되고 이전 레벨은 모두 버려집니다.
    pub fn reset(&mut self, snapshot: OrderBook) {
        self.bids = snapshot.bids;
        self.asks = snapshot.asks;
        self.timestamp = snapshot.timestamp;
        self.nonce = snapshot.nonce;
        self.sort_levels();
    }

    /// 매수는 가격 내림차순, 매도는 가격 오름차순으로 정렬합니다.
    pub fn sort_levels(&mut self) {
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
    }

    /// 양쪽 모두 최대 `limit`개 레벨만 포함한 사본을 반환합니다.
    ///
    /// `None`이면 전체 사본.
    pub fn limit(&self, limit: Option<usize>) -> OrderBook {
        let mut book = self.clone();
        if let Some(n) = limit {
            book.bids.truncate(n);
            book.asks.truncate(n);
        }
        book
    }

    /// 스냅샷 시각.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(millis_to_datetime)
    }

    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// 스프레드를 반환합니다. 차이가 Decimal 범위를 넘으면 `None`.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, quantity: Decimal) -> OrderBookLevel {
        OrderBookLevel::new(price, quantity)
    }

    #[test]
    fn test_snapshot_sorts_levels() {
        let book = OrderBook::snapshot(
            "LTC/USDT",
            vec![level(dec!(101.82), dec!(0.5942)), level(dec!(104.29), dec!(5.2264))],
            vec![level(dec!(105.54), dec!(0.6416)), level(dec!(104.81), dec!(9.5531))],
            Some(1_649_751_425_932),
        );

        assert_eq!(book.best_bid(), Some(dec!(104.29)));
        assert_eq!(book.best_ask(), Some(dec!(104.81)));
        assert_eq!(book.spread(), Some(dec!(0.52)));
    }

    #[test]
    fn test_spread_overflow() {
        let book = OrderBook::snapshot(
            "BTC/USDT",
            vec![level(Decimal::MIN, dec!(1))],
            vec![level(Decimal::MAX, dec!(1))],
            None,
        );
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn test_reset_replaces_all_levels() {
        let mut book = OrderBook::snapshot(
            "BTC/USDT",
            vec![level(dec!(100), dec!(1)), level(dec!(99), dec!(3))],
            vec![level(dec!(101), dec!(2))],
            Some(1),
        );

        book.reset(OrderBook::snapshot(
            "BTC/USDT",
            vec![level(dec!(98), dec!(5))],
            vec![],
            Some(2),
        ));

        assert_eq!(book.bids, vec![level(dec!(98), dec!(5))]);
        assert!(book.asks.is_empty());
        assert_eq!(book.timestamp, Some(2));
        assert_eq!(book.symbol, "BTC/USDT");
    }

    #[test]
    fn test_limit() {
        let book = OrderBook::snapshot(
            "ETH/USDT",
            vec![level(dec!(2000), dec!(10)), level(dec!(1999), dec!(20))],
            vec![
                level(dec!(2001), dec!(15)),
                level(dec!(2002), dec!(25)),
                level(dec!(2003), dec!(5)),
            ],
            None,
        );

        let limited = book.limit(Some(1));
        assert_eq!(limited.bids.len(), 1);
        assert_eq!(limited.asks.len(), 1);
        assert_eq!(limited.spread(), Some(dec!(1)));

        assert_eq!(book.limit(None), book);
    }
}
