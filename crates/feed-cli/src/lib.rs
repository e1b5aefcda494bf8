//! 스트림 감시 CLI 도구.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 설정 로드와 스트리밍 코어 구성
//! - `watch-*` 명령 실행과 JSON 출력

pub mod commands;

pub use commands::*;
