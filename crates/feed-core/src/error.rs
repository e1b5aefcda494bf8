//! 피드 코어 에러 타입.

use thiserror::Error;

/// 도메인 모델 및 설정 처리 중 발생하는 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 코어 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Parse(err.to_string())
    }
}

impl From<rust_decimal::Error> for CoreError {
    fn from(err: rust_decimal::Error) -> Self {
        CoreError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_error_maps_to_parse() {
        let err: CoreError = rust_decimal::Decimal::from_str("abc").unwrap_err().into();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidInput("side".to_string());
        assert_eq!(err.to_string(), "잘못된 입력: side");
    }
}
