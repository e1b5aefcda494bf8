//! 스트림 에러 타입.

use thiserror::Error;

/// 스트림 처리 중 발생하는 에러.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// 인증 실패 (자격증명 누락 또는 거부)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// 알 수 없거나 잘못된 심볼
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// 거래소가 요청을 거부함
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 분류되지 않은 에러 프레임
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 연결 끊김
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// WebSocket 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 대기 중이던 요청이 완료되지 못하고 해제됨
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::Disconnected(_)
                | ExchangeError::WebSocket(_)
        )
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ExchangeError::Authentication(_))
    }

    /// 재시도하면 안 되는 치명적 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Authentication(_)
                | ExchangeError::InvalidSymbol(_)
                | ExchangeError::BadRequest(_)
        )
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

impl From<feed_core::CoreError> for ExchangeError {
    fn from(err: feed_core::CoreError) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                ExchangeError::Disconnected(err.to_string())
            }
            WsError::Io(_) => ExchangeError::NetworkError(err.to_string()),
            _ => ExchangeError::WebSocket(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(ExchangeError::Authentication("x".into()).is_auth_error());
        assert!(ExchangeError::BadRequest("x".into()).is_fatal());
        assert!(!ExchangeError::BadRequest("x".into()).is_retryable());
        assert!(ExchangeError::Disconnected("x".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let err: ExchangeError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ExchangeError::ParseError(_)));
    }
}
