//! 마켓 식별자 정의.
//!
//! 거래소 와이어 식별자(`btc-usdt`)와 정규 심볼(`BTC/USDT`)을 함께 보관합니다.
//! `MarketRef`는 마켓 정보 제공자가 만들어 주는 불변 값이며 피드 코어는
//! 이를 생성하거나 삭제하지 않습니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 와이어 식별자의 기준/호가 자산 구분자.
pub const MARKET_ID_SEPARATOR: char = '-';

/// 정규 마켓 참조.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketRef {
    /// 정규 심볼 (예: "BTC/USDT")
    pub symbol: String,
    /// 거래소 와이어 식별자 (예: "btc-usdt")
    pub id: String,
    /// 기준 자산
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// 호가 자산
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

impl MarketRef {
    /// 새 마켓 참조를 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        id: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            id: id.into(),
            base: Some(base.into()),
            quote: Some(quote.into()),
        }
    }

    /// `base-quote` 형식의 와이어 식별자에서 마켓 참조를 만듭니다.
    ///
    /// 구분자가 없으면 `None`.
    pub fn from_id(id: &str) -> Option<Self> {
        let (base, quote) = id.split_once(MARKET_ID_SEPARATOR)?;
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        Some(Self::new(format!("{}/{}", base, quote), id, base, quote))
    }

    /// 알려지지 않은 식별자를 그대로 심볼로 사용하는 대체 참조.
    pub fn unknown(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            symbol: id.clone(),
            id,
            base: None,
            quote: None,
        }
    }
}

impl fmt::Display for MarketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
