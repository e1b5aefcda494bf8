//! 인밴드 에러 프레임 분류.
//!
//! `{"error": "..."}` 형태의 프레임을 알려진 문자열 테이블과 대조해
//! 타입이 있는 에러로 바꿉니다. 인증 에러는 공개 채널에서도 도착할 수 있어
//! 억제(`Suppressed`)하고, 나머지는 모두 전파(`Propagate`)합니다.

use serde_json::Value;

use crate::ExchangeError;

/// 에러 프레임 필드명.
const ERROR_FIELD: &str = "error";

/// 정확히 일치해야 하는 에러 문자열.
const EXACT_ERRORS: &[(&str, fn(String) -> ExchangeError)] = &[
    (
        "Bearer or HMAC authentication required",
        ExchangeError::Authentication,
    ),
    ("Error: wrong input", ExchangeError::BadRequest),
];

/// 부분 문자열로 일치하는 에러 문자열.
const BROAD_ERRORS: &[(&str, fn(String) -> ExchangeError)] =
    &[("Invalid symbol", ExchangeError::InvalidSymbol)];

/// 프레임 분류 결과.
#[derive(Debug, Clone)]
pub enum ErrorClassification {
    /// 에러 표시가 없음. 정상 처리 계속.
    Deliver,
    /// 에러지만 무시하고 프레임을 버림.
    Suppressed(ExchangeError),
    /// 메시지 처리 밖으로 전파해야 하는 에러.
    Propagate(ExchangeError),
}

/// 에러 문자열을 에러 타입으로 매핑합니다.
pub fn map_error(message: &str) -> ExchangeError {
    let feedback = message.to_string();

    if let Some((_, build)) = EXACT_ERRORS.iter().find(|(text, _)| *text == message) {
        return build(feedback);
    }
    if let Some((_, build)) = BROAD_ERRORS.iter().find(|(text, _)| message.contains(text)) {
        return build(feedback);
    }
    ExchangeError::Protocol(feedback)
}

/// 프레임을 분류합니다.
pub fn classify(frame: &Value) -> ErrorClassification {
    let message = match frame.get(ERROR_FIELD) {
        None | Some(Value::Null) => return ErrorClassification::Deliver,
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    match map_error(&message) {
        err @ ExchangeError::Authentication(_) => ErrorClassification::Suppressed(err),
        err => ErrorClassification::Propagate(err),
    }
}
