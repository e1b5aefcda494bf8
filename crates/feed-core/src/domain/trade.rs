//! 체결 기록.

use crate::domain::order::Side;
use crate::types::{millis_to_datetime, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 불변 체결 기록.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 정규 심볼
    pub symbol: String,
    /// 체결 ID (거래소가 제공하는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 체결 가격
    pub price: Price,
    /// 체결 수량
    pub amount: Quantity,
    /// 체결 금액 (가격 × 수량). 곱이 Decimal 범위를 넘으면 `None`.
    pub cost: Option<Decimal>,
    /// 체결 방향
    pub side: Option<Side>,
    /// 체결 시각 (epoch 밀리초)
    pub timestamp: Option<i64>,
}

impl Trade {
    /// 새 체결 기록을 생성합니다. 체결 금액은 자동 계산됩니다.
    pub fn new(
        symbol: impl Into<String>,
        price: Price,
        amount: Quantity,
        side: Option<Side>,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            id: None,
            price,
            amount,
            cost: price.checked_mul(amount),
            side,
            timestamp,
        }
    }

    /// 체결 시각.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(millis_to_datetime)
    }
}
