//! 거래소 원본 메시지 파싱.
//!
//! 숫자는 JSON 숫자/문자열 모두 허용하며 `f64`를 거치지 않고 문자열
//! 표현에서 바로 `Decimal`로 변환합니다. 필수가 아닌 필드가 없으면 `None`
//! (또는 빈 컬렉션)으로 처리합니다.

use std::collections::BTreeSet;

use feed_core::{
    parse_decimal, parse_iso8601, Account, Fee, MarketRef, Order, OrderBook, OrderBookLevel,
    OrderStatusType, OrderType, Side, Trade,
};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use tracing::debug;

use crate::traits::{ExchangeResult, MarketResolver};
use crate::ExchangeError;

/// 잔고 키의 통화/종류 구분자.
const BALANCE_KEY_SEPARATOR: char = '_';

/// JSON 숫자를 지수 표기 없는 Decimal 문자열로 변환합니다.
fn number_to_string(n: &Number) -> String {
    let raw = n.to_string();
    parse_decimal(&raw)
        .map(|d| d.normalize().to_string())
        .unwrap_or(raw)
}

/// 문자열 또는 숫자 필드를 문자열로 읽습니다.
pub fn safe_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        _ => None,
    }
}

/// 값을 `Decimal`로 변환합니다.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s).ok(),
        Value::Number(n) => parse_decimal(&n.to_string()).ok(),
        _ => None,
    }
}

/// 필드를 `Decimal`로 읽습니다.
pub fn safe_decimal(value: &Value, key: &str) -> Option<Decimal> {
    value.get(key).and_then(value_to_decimal)
}

/// ISO-8601 필드를 epoch 밀리초로 읽습니다.
pub fn safe_iso8601(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_str).and_then(parse_iso8601)
}

/// `[price, size]` 배열 목록을 가격 레벨로 변환합니다.
fn parse_levels(value: Option<&Value>) -> Vec<OrderBookLevel> {
    let Some(Value::Array(rows)) = value else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let pair = row.as_array()?;
            let price = value_to_decimal(pair.first()?)?;
            let quantity = value_to_decimal(pair.get(1)?)?;
            Some(OrderBookLevel::new(price, quantity))
        })
        .collect()
}

/// 호가창 스냅샷을 파싱합니다.
///
/// `data`: `{ "bids": [[p, s], ...], "asks": [[p, s], ...], "timestamp": "ISO-8601" }`
pub fn parse_order_book(data: &Value, symbol: &str) -> OrderBook {
    let timestamp = safe_iso8601(data, "timestamp");
    OrderBook::snapshot(
        symbol,
        parse_levels(data.get("bids")),
        parse_levels(data.get("asks")),
        timestamp,
    )
}

/// 체결 한 건을 파싱합니다. 가격이나 수량이 없으면 `None`.
pub fn parse_trade(raw: &Value, market: &MarketRef) -> Option<Trade> {
    let price = safe_decimal(raw, "price")?;
    let amount = safe_decimal(raw, "size")?;
    let side = raw
        .get("side")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Side>().ok());
    let timestamp = safe_iso8601(raw, "timestamp");

    let mut trade = Trade::new(market.symbol.clone(), price, amount, side, timestamp);
    trade.id = safe_string(raw, "id");
    Some(trade)
}

/// 체결 배열을 파싱합니다. 배열이 아니면 빈 목록.
pub fn parse_trades(data: Option<&Value>, market: &MarketRef) -> Vec<Trade> {
    let Some(Value::Array(rows)) = data else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|raw| {
            let parsed = parse_trade(raw, market);
            if parsed.is_none() {
                debug!(symbol = %market.symbol, "Skipping trade without price/size");
            }
            parsed
        })
        .collect()
}

/// 주문 한 건을 파싱합니다.
///
/// # Errors
/// `id` 필드가 없으면 `ExchangeError::ParseError`.
pub fn parse_order(raw: &Value, market: &MarketRef) -> ExchangeResult<Order> {
    let id = safe_string(raw, "id")
        .ok_or_else(|| ExchangeError::ParseError("order without id".to_string()))?;

    let price = safe_decimal(raw, "price");
    let amount = safe_decimal(raw, "size");
    let filled = safe_decimal(raw, "filled");
    let remaining = match (amount, filled) {
        (Some(a), Some(f)) => a.checked_sub(f).map(|r| r.max(Decimal::ZERO)),
        _ => None,
    };
    let cost = match (filled, price) {
        (Some(f), Some(p)) if p > Decimal::ZERO => f.checked_mul(p),
        _ => None,
    };

    let fee_cost = safe_decimal(raw, "fee");
    let fee_currency = safe_string(raw, "fee_coin").map(|c| c.to_uppercase());
    let fee = if fee_cost.is_some() || fee_currency.is_some() {
        Some(Fee {
            currency: fee_currency,
            cost: fee_cost,
        })
    } else {
        None
    };

    Ok(Order {
        id,
        symbol: market.symbol.clone(),
        side: raw
            .get("side")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        order_type: raw
            .get("type")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<OrderType>().ok()),
        price,
        amount,
        filled,
        remaining,
        cost,
        status: raw
            .get("status")
            .and_then(Value::as_str)
            .map(OrderStatusType::from_venue)
            .unwrap_or(OrderStatusType::Unknown),
        timestamp: safe_iso8601(raw, "created_at"),
        last_update_timestamp: safe_iso8601(raw, "updated_at"),
        fee,
    })
}

/// 잔고 맵에서 통화별 계좌를 파싱합니다.
///
/// 키는 `"<currency>_balance"` / `"<currency>_available"` 형식이며, 마지막
/// 구분자 앞부분을 통화 ID로 사용합니다. 결과는 통화 코드 순으로 정렬됩니다.
pub fn parse_balance(data: &Value, resolver: &dyn MarketResolver) -> Vec<(String, Account)> {
    let Some(map) = data.as_object() else {
        return Vec::new();
    };

    let currency_ids: BTreeSet<&str> = map
        .keys()
        .filter_map(|key| key.rsplit_once(BALANCE_KEY_SEPARATOR).map(|(id, _)| id))
        .filter(|id| !id.is_empty())
        .collect();

    currency_ids
        .into_iter()
        .map(|id| {
            let free = safe_string(data, &format!("{}_available", id));
            let total = safe_string(data, &format!("{}_balance", id));
            (resolver.currency_code(id), Account::new(free, total))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticMarketResolver;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ltc() -> MarketRef {
        MarketRef::from_id("ltc-usdt").unwrap()
    }

    #[test]
    fn test_safe_string_avoids_exponent() {
        let data = json!({ "a": 0.00005, "b": "18.94344188", "c": 0, "d": null });
        assert_eq!(safe_string(&data, "a").as_deref(), Some("0.00005"));
        assert_eq!(safe_string(&data, "b").as_deref(), Some("18.94344188"));
        assert_eq!(safe_string(&data, "c").as_deref(), Some("0"));
        assert_eq!(safe_string(&data, "d"), None);
        assert_eq!(safe_string(&data, "missing"), None);
    }

    #[test]
    fn test_parse_order_book() {
        let data = json!({
            "bids": [[103.86, 1.3629], [104.29, 5.2264]],
            "asks": [[105.54, 0.6416], ["104.81", "9.5531"], ["bad"]],
            "timestamp": "2022-04-12T08:17:05.932Z"
        });

        let book = parse_order_book(&data, "LTC/USDT");
        assert_eq!(book.best_bid(), Some(dec!(104.29)));
        assert_eq!(book.best_ask(), Some(dec!(104.81)));
        assert_eq!(book.asks.len(), 2);
        assert_eq!(book.timestamp, Some(1_649_751_425_932));
    }

    #[test]
    fn test_parse_order_book_missing_fields() {
        let book = parse_order_book(&json!({}), "LTC/USDT");
        assert!(book.bids.is_empty());
        assert!(book.asks.is_empty());
        assert!(book.timestamp.is_none());
    }

    #[test]
    fn test_parse_trades() {
        let data = json!([
            { "size": 0.05145, "price": 41977.9, "side": "buy", "timestamp": "2022-04-11T09:40:10.881Z" },
            { "side": "sell" }
        ]);
        let market = MarketRef::from_id("btc-usdt").unwrap();

        let trades = parse_trades(Some(&data), &market);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "BTC/USDT");
        assert_eq!(trades[0].price, dec!(41977.9));
        assert_eq!(trades[0].amount, dec!(0.05145));
        assert_eq!(trades[0].side, Some(Side::Buy));

        assert!(parse_trades(None, &market).is_empty());
        assert!(parse_trades(Some(&json!({})), &market).is_empty());
    }

    #[test]
    fn test_parse_order() {
        let raw = json!({
            "symbol": "ltc-usdt",
            "side": "buy",
            "size": 0.05,
            "type": "limit",
            "price": 100,
            "fee_structure": { "maker": 0.1, "taker": 0.1 },
            "fee_coin": "ltc",
            "fee": 0.00005,
            "id": "ce38fd48-b336-400b-812b-60c636454231",
            "created_by": 155328,
            "filled": 0.02,
            "created_at": "2022-04-11T14:09:00.760Z",
            "updated_at": "2022-04-11T14:09:00.760Z",
            "status": "pfilled"
        });

        let order = parse_order(&raw, &ltc()).unwrap();
        assert_eq!(order.id, "ce38fd48-b336-400b-812b-60c636454231");
        assert_eq!(order.symbol, "LTC/USDT");
        assert_eq!(order.side, Some(Side::Buy));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.remaining, Some(dec!(0.03)));
        assert_eq!(order.cost, Some(dec!(2)));
        assert_eq!(order.status, OrderStatusType::PartiallyFilled);
        let fee = order.fee.unwrap();
        assert_eq!(fee.currency.as_deref(), Some("LTC"));
        assert_eq!(fee.cost, Some(dec!(0.00005)));
    }

    #[test]
    fn test_parse_order_requires_id() {
        let err = parse_order(&json!({ "side": "buy" }), &ltc()).unwrap_err();
        assert!(matches!(err, ExchangeError::ParseError(_)));
    }

    #[test]
    fn test_parse_balance() {
        let resolver = StaticMarketResolver::new();
        let data = json!({
            "usdt_balance": 18.94344188,
            "usdt_available": 18.94344188,
            "ltc_balance": 0.00005,
            "ltc_available": 0,
            "noseparator": 1
        });

        let accounts = parse_balance(&data, &resolver);
        assert_eq!(accounts.len(), 2);

        let (code, ltc) = &accounts[0];
        assert_eq!(code, "LTC");
        assert_eq!(ltc.free.as_deref(), Some("0"));
        assert_eq!(ltc.total.as_deref(), Some("0.00005"));
        assert_eq!(ltc.used.as_deref(), Some("0.00005"));

        let (code, usdt) = &accounts[1];
        assert_eq!(code, "USDT");
        assert_eq!(usdt.total.as_deref(), Some("18.94344188"));
    }
}
