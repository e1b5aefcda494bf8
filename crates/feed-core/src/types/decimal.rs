//! 정밀한 금액 표현을 위한 Decimal 유틸리티.
//!
//! 거래소가 보내는 숫자는 부동소수점으로 변환하지 않고 문자열 표현
//! 그대로 `Decimal`로 파싱합니다.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 가격 타입.
pub type Price = Decimal;

/// 수량 타입.
pub type Quantity = Decimal;

/// 문자열을 `Decimal`로 파싱합니다.
///
/// 지수 표기(`1e-8`)도 허용합니다.
pub fn parse_decimal(s: &str) -> CoreResult<Decimal> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| CoreError::Parse(format!("{}: {}", trimmed, e)))
}

/// 두 Decimal 문자열의 차이(`a - b`)를 문자열로 반환합니다.
///
/// 둘 중 하나라도 파싱할 수 없거나 결과가 범위를 넘으면 `None`.
pub fn decimal_string_sub(a: &str, b: &str) -> Option<String> {
    let a = parse_decimal(a).ok()?;
    let b = parse_decimal(b).ok()?;
    Some(a.checked_sub(b)?.normalize().to_string())
}
