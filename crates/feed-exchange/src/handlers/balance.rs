//! 잔고 핸들러.

use std::sync::Arc;

use feed_core::{feed_span, now_millis};
use serde_json::Value;
use tracing::debug;

use super::{Resolution, StreamState};
use crate::parser::parse_balance;
use crate::topic::{message_hash, Topic};
use crate::traits::MarketResolver;
use crate::waiters::StreamUpdate;

impl StreamState {
    /// 지갑 프레임을 잔고에 병합합니다.
    ///
    /// 프레임에 포함된 통화만 교체되고 나머지 통화는 이전 값을 유지합니다.
    /// `wallet` 대기자를 해제합니다.
    pub fn handle_balance(&mut self, frame: &Value, resolver: &dyn MarketResolver) -> Resolution {
        let _span = feed_span!("balance", Topic::Wallet).entered();

        let accounts = match frame.get("data") {
            Some(data) => parse_balance(data, resolver),
            None => Vec::new(),
        };
        let touched = accounts.len();
        for (code, account) in accounts {
            self.balance.merge_account(code, account);
        }
        self.balance.timestamp = Some(now_millis());
        debug!(touched, currencies = self.balance.len(), "Balance merged");

        let resolution = Resolution::new(vec![message_hash(Topic::Wallet, None)]);
        let update = self
            .wants_update(&resolution)
            .then(|| StreamUpdate::Balance(Arc::new(self.balance.clone())));
        resolution.with_update(update)
    }
}
