//! 메모리 기반 마켓 조회기.

use std::collections::HashMap;

use feed_core::MarketRef;

use crate::traits::MarketResolver;

/// 미리 등록된 마켓만 조회하는 `MarketResolver`.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketResolver {
    by_id: HashMap<String, MarketRef>,
    by_symbol: HashMap<String, MarketRef>,
}

impl StaticMarketResolver {
    /// 빈 조회기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 마켓을 등록합니다.
    pub fn insert(&mut self, market: MarketRef) {
        self.by_symbol.insert(market.symbol.clone(), market.clone());
        self.by_id.insert(market.id.clone(), market);
    }

    /// `base-quote` 형식의 와이어 식별자 목록으로 조회기를 만듭니다.
    ///
    /// 형식이 맞지 않는 식별자는 건너뜁니다.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolver = Self::new();
        for id in ids {
            match MarketRef::from_id(id.as_ref()) {
                Some(market) => resolver.insert(market),
                None => tracing::warn!(id = id.as_ref(), "Skipping malformed market id"),
            }
        }
        resolver
    }

    /// 등록된 마켓 수.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl MarketResolver for StaticMarketResolver {
    fn resolve_market(&self, id: &str) -> Option<MarketRef> {
        self.by_id.get(id).cloned()
    }

    fn market(&self, symbol: &str) -> Option<MarketRef> {
        self.by_symbol.get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        let resolver = StaticMarketResolver::from_ids(["btc-usdt", "ltc-usdt", "bogus"]);
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.resolve_market("ltc-usdt").unwrap().symbol, "LTC/USDT");
        assert_eq!(resolver.market("BTC/USDT").unwrap().id, "btc-usdt");
        assert!(resolver.market("ETH/USDT").is_none());
        assert_eq!(resolver.currency_code("usdt"), "USDT");
    }
}
