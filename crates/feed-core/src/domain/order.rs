//! 주문 타입.
//!
//! 이 모듈은 스트림으로 전달되는 주문 관련 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형
//! - `OrderStatusType` - 주문 상태
//! - `Fee` - 수수료 정보
//! - `Order` - 주문 엔티티 (동일성: 심볼 + ID)

use crate::error::CoreError;
use crate::types::{millis_to_datetime, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(CoreError::InvalidInput(format!("unknown side: {}", s))),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 주문
    Market,
    /// 지정가 주문
    Limit,
}

impl FromStr for OrderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            _ => Err(CoreError::InvalidInput(format!("unknown order type: {}", s))),
        }
    }
}

/// 주문 상태 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// 거래소에 접수됨 (대기 중)
    Open,
    /// 부분 체결됨
    PartiallyFilled,
    /// 전량 체결됨
    Filled,
    /// 취소됨
    Cancelled,
    /// 알 수 없는 상태
    Unknown,
}

impl OrderStatusType {
    /// 거래소 상태 문자열을 변환합니다.
    ///
    /// `new`/`pfilled`/`filled`/`canceled` 외의 값은 `Unknown`.
    pub fn from_venue(status: &str) -> Self {
        match status {
            "new" => OrderStatusType::Open,
            "pfilled" => OrderStatusType::PartiallyFilled,
            "filled" => OrderStatusType::Filled,
            "canceled" | "cancelled" => OrderStatusType::Cancelled,
            _ => OrderStatusType::Unknown,
        }
    }
}

/// 주문 수수료.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// 수수료 통화 코드
    pub currency: Option<String>,
    /// 수수료 금액
    pub cost: Option<Decimal>,
}

/// 주문 엔티티.
///
/// 같은 (심볼, ID)의 새 메시지는 기존 레코드를 통째로 대체합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 거래소 주문 ID
    pub id: String,
    /// 정규 심볼
    pub symbol: String,
    /// 주문 방향
    pub side: Option<Side>,
    /// 주문 유형
    pub order_type: Option<OrderType>,
    /// 주문 가격
    pub price: Option<Price>,
    /// 주문 수량
    pub amount: Option<Quantity>,
    /// 체결 수량
    pub filled: Option<Quantity>,
    /// 잔여 수량
    pub remaining: Option<Quantity>,
    /// 체결 금액
    pub cost: Option<Decimal>,
    /// 주문 상태
    pub status: OrderStatusType,
    /// 생성 시각 (epoch 밀리초)
    pub timestamp: Option<i64>,
    /// 마지막 갱신 시각 (epoch 밀리초)
    pub last_update_timestamp: Option<i64>,
    /// 수수료
    pub fee: Option<Fee>,
}

impl Order {
    /// 캐시 동일성 키.
    pub fn key(&self) -> (&str, &str) {
        (&self.symbol, &self.id)
    }

    /// 생성 시각.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(millis_to_datetime)
    }
}
