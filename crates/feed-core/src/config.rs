//! 설정 관리.
//!
//! 파일(TOML)과 `FEED__` 접두사 환경 변수에서 애플리케이션 설정을 로드합니다.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 기본 스트리밍 엔드포인트.
pub const DEFAULT_WS_URL: &str = "wss://api.hollaex.com/stream";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 스트림 설정
    #[serde(default)]
    pub stream: StreamConfig,
    /// API 자격증명
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 미리 등록할 마켓 와이어 식별자 (예: "btc-usdt")
    #[serde(default)]
    pub markets: Vec<String>,
}

/// 스트림 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket 엔드포인트
    pub ws_url: String,
    /// 요청 타임아웃 (밀리초). 인증 만료 토큰의 유효 구간으로도 쓰입니다.
    pub timeout_ms: u64,
    /// 마켓별 체결 캐시 용량
    pub trades_limit: usize,
    /// 주문 캐시 용량
    pub orders_limit: usize,
    /// 하트비트 전송 간격 (초)
    pub ping_interval_secs: u64,
    /// 전송 이벤트 채널 용량
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            timeout_ms: 10_000,
            trades_limit: 1000,
            orders_limit: 1000,
            ping_interval_secs: 30,
            channel_capacity: 1000,
        }
    }
}

/// API 자격증명 설정.
///
/// # 보안
/// - `Debug` 구현은 `api_secret`을 마스킹합니다.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// API 키
    pub api_key: Option<String>,
    /// API 시크릿
    pub api_secret: Option<String>,
}

impl CredentialsConfig {
    /// 키와 시크릿이 모두 설정되어 있는지 확인합니다.
    pub fn is_complete(&self) -> bool {
        matches!((&self.api_key, &self.api_secret), (Some(k), Some(s)) if !k.is_empty() && !s.is_empty())
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &self.api_key)
            .field(
                "api_secret",
                &self.api_secret.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("stream.ws_url", DEFAULT_WS_URL)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("FEED")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.trades_limit, 1000);
        assert_eq!(config.orders_limit, 1000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.stream.trades_limit, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = CredentialsConfig {
            api_key: Some("key".to_string()),
            api_secret: Some("super-secret".to_string()),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
        assert!(creds.is_complete());
        assert!(!CredentialsConfig::default().is_complete());
    }
}
