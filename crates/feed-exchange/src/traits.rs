//! 코어가 의존하는 외부 협력자 trait 정의.
//!
//! 코어는 기본 구현을 상속받지 않고 생성 시점에 주입된 좁은 인터페이스
//! (`MarketResolver`, `Transport`)에만 의존합니다.

use async_trait::async_trait;
use feed_core::MarketRef;
use serde_json::Value;

use crate::ExchangeError;

/// 스트림 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 마켓 메타데이터 조회.
///
/// 마켓 로딩 자체는 코어의 관심사가 아니며, 이미 로드된 정보를 조회만 합니다.
pub trait MarketResolver: Send + Sync {
    /// 와이어 식별자(예: "btc-usdt")로 마켓을 조회합니다.
    fn resolve_market(&self, id: &str) -> Option<MarketRef>;

    /// 정규 심볼(예: "BTC/USDT")로 마켓을 조회합니다.
    fn market(&self, symbol: &str) -> Option<MarketRef>;

    /// 거래소 통화 ID를 통화 코드로 변환합니다.
    fn currency_code(&self, currency_id: &str) -> String {
        currency_id.to_uppercase()
    }
}

/// 메시지 전송 계층.
///
/// 구현체는 URL별로 하나의 물리 연결을 유지하고, 연결 이후 디코딩된 모든
/// 프레임을 `TransportEvent::Frame`으로 코어에 전달해야 합니다.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `url` 연결(없으면 새로 생성)로 페이로드를 전송합니다.
    async fn send(&self, url: &str, payload: &Value) -> ExchangeResult<()>;
}

/// 전송 계층이 코어에 전달하는 이벤트.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// 디코딩된 텍스트 프레임
    Frame {
        /// 프레임을 수신한 연결 URL
        url: String,
        /// 원본 텍스트
        text: String,
    },
    /// 연결 종료
    Closed {
        /// 종료된 연결 URL
        url: String,
    },
    /// 연결 수준 에러
    Error {
        /// 에러가 발생한 연결 URL
        url: String,
        /// 에러 내용
        error: ExchangeError,
    },
}
