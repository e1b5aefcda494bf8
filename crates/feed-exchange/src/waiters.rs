//! 구독 해시별 대기자(waiter) 레지스트리.
//!
//! 각 `watch*` 호출은 해시에 일회성 채널을 하나 등록하고, 채널 핸들러가
//! 해당 해시의 대기자를 모두 꺼내 같은 업데이트로 해제합니다. 대기 중인
//! `Waiter`를 drop 하면 레지스트리에서 즉시 제거됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use feed_core::{Balance, Order, OrderBook, Trade};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::traits::ExchangeResult;
use crate::ExchangeError;

/// 대기자에게 전달되는 업데이트.
///
/// 같은 해시의 대기자들은 하나의 스냅샷을 `Arc`로 공유합니다.
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    /// 호가창 전체 스냅샷
    OrderBook(Arc<OrderBook>),
    /// 해당 마켓 체결 캐시 사본
    Trades(Arc<Vec<Trade>>),
    /// 주문 캐시 사본
    Orders(Arc<Vec<Order>>),
    /// 잔고 전체
    Balance(Arc<Balance>),
}

#[derive(Default)]
struct Pending {
    next_id: u64,
    by_hash: HashMap<String, Vec<(u64, oneshot::Sender<StreamUpdate>)>>,
}

/// 해시 → 대기자 목록.
#[derive(Default)]
pub struct WaiterRegistry {
    inner: Mutex<Pending>,
}

impl std::fmt::Debug for WaiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WaiterRegistry")
            .field("hashes", &inner.by_hash.len())
            .finish()
    }
}

impl WaiterRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 해시에 대기자를 등록합니다.
    pub fn register(self: &Arc<Self>, hash: impl Into<String>) -> Waiter {
        let hash = hash.into();
        let (tx, rx) = oneshot::channel();

        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id = inner.next_id.wrapping_add(1);
            inner.by_hash.entry(hash.clone()).or_default().push((id, tx));
            id
        };
        trace!(hash = %hash, id, "Waiter registered");

        Waiter {
            hash,
            id,
            rx,
            registry: Arc::downgrade(self),
            done: false,
        }
    }

    /// 해시의 모든 대기자를 해제하고 목록을 비웁니다.
    ///
    /// 실제로 업데이트를 받은 대기자 수를 반환합니다.
    pub fn resolve(&self, hash: &str, update: &StreamUpdate) -> usize {
        let senders = self.inner.lock().by_hash.remove(hash).unwrap_or_default();

        let delivered = senders
            .into_iter()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(_, tx)| tx.send(update.clone()).is_ok())
            .filter(|ok| *ok)
            .count();
        if delivered > 0 {
            trace!(hash = %hash, delivered, "Waiters resolved");
        }
        delivered
    }

    /// 대기자 하나를 제거합니다.
    pub fn remove(&self, hash: &str, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(list) = inner.by_hash.get_mut(hash) {
            list.retain(|(waiter_id, _)| *waiter_id != id);
            if list.is_empty() {
                inner.by_hash.remove(hash);
            }
        }
    }

    /// 해시의 대기자 수.
    pub fn pending_count(&self, hash: &str) -> usize {
        self.inner.lock().by_hash.get(hash).map_or(0, Vec::len)
    }

    /// 해시 중 하나라도 대기자가 있는지 확인.
    pub fn has_pending<S: AsRef<str>>(&self, hashes: &[S]) -> bool {
        let inner = self.inner.lock();
        hashes
            .iter()
            .any(|hash| inner.by_hash.contains_key(hash.as_ref()))
    }

    /// 전체 대기자 수.
    pub fn total_pending(&self) -> usize {
        self.inner.lock().by_hash.values().map(Vec::len).sum()
    }
}

/// 특정 해시의 다음 업데이트를 기다리는 future.
///
/// 완료 전에 drop 되면 레지스트리에서 자신을 제거합니다.
#[must_use = "waiters do nothing unless awaited"]
pub struct Waiter {
    hash: String,
    id: u64,
    rx: oneshot::Receiver<StreamUpdate>,
    registry: Weak<WaiterRegistry>,
    done: bool,
}

impl Waiter {
    /// 대기 중인 해시.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("hash", &self.hash)
            .field("id", &self.id)
            .field("done", &self.done)
            .finish()
    }
}

impl Future for Waiter {
    type Output = ExchangeResult<StreamUpdate>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(result) => {
                this.done = true;
                Poll::Ready(result.map_err(|_| {
                    ExchangeError::Cancelled(format!("waiter for {} was dropped", this.hash))
                }))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.hash, self.id);
            trace!(hash = %self.hash, id = self.id, "Waiter cancelled");
        }
    }
}
