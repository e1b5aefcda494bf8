//! 스트림 토픽과 메시지 해시.

use std::fmt;
use std::str::FromStr;

use crate::ExchangeError;

/// 거래소가 푸시하는 토픽.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 호가창
    OrderBook,
    /// 공개 체결
    Trade,
    /// 내 주문 (인증 필요)
    Order,
    /// 지갑 잔고 (인증 필요)
    Wallet,
}

impl Topic {
    /// 와이어 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrderBook => "orderbook",
            Topic::Trade => "trade",
            Topic::Order => "order",
            Topic::Wallet => "wallet",
        }
    }

    /// 인증이 필요한 토픽인지 확인.
    pub fn is_private(&self) -> bool {
        matches!(self, Topic::Order | Topic::Wallet)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orderbook" => Ok(Topic::OrderBook),
            "trade" => Ok(Topic::Trade),
            "order" => Ok(Topic::Order),
            "wallet" => Ok(Topic::Wallet),
            _ => Err(ExchangeError::ParseError(format!("unknown topic: {}", s))),
        }
    }
}

/// 구독 해시(`topic` 또는 `topic:marketId`)를 만듭니다.
pub fn message_hash(topic: Topic, market_id: Option<&str>) -> String {
    match market_id {
        Some(id) => format!("{}:{}", topic, id),
        None => topic.to_string(),
    }
}
