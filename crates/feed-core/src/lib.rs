//! # Feed Core
//!
//! 스트리밍 피드의 정규화된 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 거래소별 푸시 메시지를 정규화한 결과 타입을 정의합니다:
//! - 마켓 식별자 (`MarketRef`)
//! - 호가창 (`OrderBook`)
//! - 체결 기록 (`Trade`)
//! - 주문 기록 (`Order`)
//! - 계좌 잔고 (`Balance`)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
