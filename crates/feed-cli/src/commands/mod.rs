//! CLI 명령 구현.

pub mod watch;

pub use watch::*;
