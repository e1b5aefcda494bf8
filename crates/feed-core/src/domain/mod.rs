//! 정규화된 스트리밍 엔티티.

pub mod balance;
pub mod order;
pub mod order_book;
pub mod trade;

pub use balance::*;
pub use order::*;
pub use order_book::*;
pub use trade::*;
