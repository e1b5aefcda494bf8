//! 인증 채널 서명.
//!
//! 비공개 채널은 서명된 쿼리 문자열이 붙은 URL로 접속합니다.
//! 서명 대상 문자열은 `"CONNECT" + "/stream" + expires`이며 구분자 없이 이어
//! 붙입니다. 만료 토큰은 채널 종류별로 메모이제이션하여 호출마다 새 URL
//! (= 새 물리 연결)이 생기지 않도록 합니다.

use std::collections::HashMap;
use std::fmt;

use feed_core::CredentialsConfig;
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use crate::traits::ExchangeResult;
use crate::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// 서명 대상 동사.
const AUTH_VERB: &str = "CONNECT";

/// 서명 대상 경로.
const AUTH_PATH: &str = "/stream";

/// API 키/시크릿으로 스트림 접속을 서명합니다.
///
/// # 보안
/// - `Debug` 구현은 키를 마스킹하고 시크릿은 출력하지 않습니다.
pub struct Signer {
    api_key: String,
    api_secret: SecretString,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars: Vec<char> = self.api_key.chars().collect();
        let masked_key = if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("Signer")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .finish()
    }
}

impl Signer {
    /// 새 서명기를 생성합니다.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::new(api_secret.into().into_boxed_str()),
        }
    }

    /// 설정의 자격증명으로 서명기를 생성합니다.
    ///
    /// # Errors
    /// 키 또는 시크릿이 비어 있으면 `ExchangeError::Authentication`.
    pub fn from_credentials(credentials: &CredentialsConfig) -> ExchangeResult<Self> {
        match (&credentials.api_key, &credentials.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok(Self::new(key.clone(), secret.clone()))
            }
            _ => Err(ExchangeError::Authentication(
                "requires apiKey and secret credentials".to_string(),
            )),
        }
    }

    /// API 키.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// 만료 토큰에 대한 HMAC-SHA256 서명(hex)을 반환합니다.
    pub fn sign(&self, expires: &str) -> ExchangeResult<String> {
        let payload = format!("{}{}{}", AUTH_VERB, AUTH_PATH, expires);
        let mut mac = HmacSha256::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Authentication(format!("invalid secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 현재 시각(초)과 타임아웃(밀리초)으로 만료 토큰을 계산합니다.
    ///
    /// `now_seconds + floor(timeout_ms / 1000)`
    pub fn next_expiry(now_seconds: i64, timeout_ms: u64) -> String {
        let window = i64::try_from(timeout_ms / 1000).unwrap_or(i64::MAX);
        now_seconds.saturating_add(window).to_string()
    }

    /// 서명된 스트림 URL을 만듭니다.
    ///
    /// 쿼리 파라미터: `api-key`, `api-signature`, `api-expires`.
    pub fn signed_url(&self, base_url: &str, expires: &str) -> ExchangeResult<String> {
        let signature = self.sign(expires)?;
        let query = build_query(&[
            ("api-key", self.api_key.as_str()),
            ("api-signature", signature.as_str()),
            ("api-expires", expires),
        ]);
        Ok(format!("{}?{}", base_url, query))
    }
}

/// 파라미터에서 쿼리 문자열 생성.
fn build_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 비예약 문자 외에는 퍼센트 인코딩합니다.
fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// 만료 토큰을 메모이제이션하는 비공개 채널 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivateChannel {
    /// 주문 채널
    Orders,
    /// 잔고 채널
    Balance,
}

/// 채널 종류별 만료 토큰 캐시.
///
/// 같은 유효 구간 안에서는 항상 같은 토큰을 돌려줍니다. 토큰이 만료되었거나
/// 명시적으로 무효화되면 새로 계산합니다.
#[derive(Debug)]
pub struct ExpiryCache {
    timeout_ms: u64,
    tokens: Mutex<HashMap<PrivateChannel, String>>,
}

impl ExpiryCache {
    /// 새 캐시를 생성합니다.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// 메모이제이션된 토큰을 반환하거나 새로 만듭니다.
    pub fn get_or_create(&self, channel: PrivateChannel, now_seconds: i64) -> String {
        let mut tokens = self.tokens.lock();
        if let Some(token) = tokens.get(&channel) {
            let still_valid = token
                .parse::<i64>()
                .map(|expires| expires > now_seconds)
                .unwrap_or(false);
            if still_valid {
                return token.clone();
            }
        }

        let token = Signer::next_expiry(now_seconds, self.timeout_ms);
        debug!(?channel, expires = %token, "Generated new stream expiry");
        tokens.insert(channel, token.clone());
        token
    }

    /// 채널의 토큰을 무효화합니다.
    pub fn invalidate(&self, channel: PrivateChannel) {
        self.tokens.lock().remove(&channel);
    }

    /// 현재 메모이제이션된 토큰.
    pub fn current(&self, channel: PrivateChannel) -> Option<String> {
        self.tokens.lock().get(&channel).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign() {
        let signer = Signer::new("key", "secret");
        assert_eq!(
            signer.sign("1649751435").unwrap(),
            "8ecff39f512e23a285d6367c1ed8f79eab6723bfcb3058e75cb9029f1fb50b7f"
        );
    }

    #[test]
    fn test_next_expiry_floors_timeout() {
        assert_eq!(Signer::next_expiry(1_649_751_425, 10_000), "1649751435");
        assert_eq!(Signer::next_expiry(100, 1_999), "101");
        assert_eq!(Signer::next_expiry(100, 999), "100");
    }

    #[test]
    fn test_signed_url() {
        let signer = Signer::new("my-key", "api-secret");
        let url = signer
            .signed_url("wss://api.hollaex.com/stream", "1700000010")
            .unwrap();
        assert_eq!(
            url,
            "wss://api.hollaex.com/stream?api-key=my-key\
             &api-signature=68370944b073537fdc3fcbdc44dfc68e23ada7e69b57d87a89c3eb6731aa1575\
             &api-expires=1700000010"
        );
    }

    #[test]
    fn test_from_credentials_requires_both() {
        let missing = CredentialsConfig {
            api_key: Some("k".to_string()),
            api_secret: None,
        };
        let err = Signer::from_credentials(&missing).unwrap_err();
        assert!(err.is_auth_error());

        let full = CredentialsConfig {
            api_key: Some("k".to_string()),
            api_secret: Some("s".to_string()),
        };
        assert_eq!(Signer::from_credentials(&full).unwrap().api_key(), "k");
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Signer::new("abcdefghijkl", "very-secret");
        let debug = format!("{:?}", signer);
        assert!(debug.contains("abcd...ijkl"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_debug_masks_multibyte_key() {
        let signer = Signer::new("키키키키-중간값-끝끝끝끝", "secret");
        let debug = format!("{:?}", signer);
        assert!(debug.contains("키키키키...끝끝끝끝"));
        assert!(!debug.contains("중간값"));
    }

    #[test]
    fn test_expiry_memoized_within_window() {
        let cache = ExpiryCache::new(10_000);
        let first = cache.get_or_create(PrivateChannel::Orders, 1_000);
        let second = cache.get_or_create(PrivateChannel::Orders, 1_005);
        assert_eq!(first, "1010");
        assert_eq!(first, second);
    }

    #[test]
    fn test_expiry_per_channel() {
        let cache = ExpiryCache::new(10_000);
        let orders = cache.get_or_create(PrivateChannel::Orders, 1_000);
        let balance = cache.get_or_create(PrivateChannel::Balance, 1_003);
        assert_eq!(orders, "1010");
        assert_eq!(balance, "1013");
    }

    #[test]
    fn test_expiry_regenerated_after_invalidate_or_expiry() {
        let cache = ExpiryCache::new(10_000);
        let first = cache.get_or_create(PrivateChannel::Balance, 1_000);

        cache.invalidate(PrivateChannel::Balance);
        assert!(cache.current(PrivateChannel::Balance).is_none());
        let after_invalidate = cache.get_or_create(PrivateChannel::Balance, 1_002);
        assert_ne!(first, after_invalidate);

        let after_expiry = cache.get_or_create(PrivateChannel::Balance, 1_012);
        assert_eq!(after_expiry, "1022");
    }
}
