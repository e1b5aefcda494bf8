//! HollaEx 스트리밍 정규화 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 구독 해시 기반 메시지 라우팅과 대기자(waiter) 해제
//! - 채널별 상태 조정 (호가창 스냅샷 교체, 체결/주문 제한 캐시, 잔고 병합)
//! - 인증 채널 서명과 만료 토큰 메모이제이션
//! - 인밴드 에러 프레임 분류
//! - tokio-tungstenite 기반 WebSocket 전송

pub mod cache;
pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod resolver;
pub mod router;
pub mod signer;
pub mod stream;
pub mod topic;
pub mod traits;
pub mod waiters;
pub mod websocket;

pub use cache::{OrderCache, TradeCache};
pub use classifier::{classify, ErrorClassification};
pub use error::*;
pub use handlers::StreamState;
pub use resolver::StaticMarketResolver;
pub use router::SubscriptionRouter;
pub use signer::{ExpiryCache, PrivateChannel, Signer};
pub use stream::{HollaexStream, Params};
pub use topic::{message_hash, Topic};
pub use traits::*;
pub use waiters::{StreamUpdate, Waiter, WaiterRegistry};
pub use websocket::WsTransport;
