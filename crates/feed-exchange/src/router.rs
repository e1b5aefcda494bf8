//! 구독 라우터.
//!
//! 구독 요청을 만들어 전송하고, 해시에 묶인 `Waiter`를 돌려줍니다. 같은
//! 연결(URL)에서 이미 구독한 해시는 다시 보내지 않으며, 동시 호출자는 각자의
//! 대기자를 받아 하나의 구독을 공유합니다.
//!
//! 전송 중인 구독 요청이 있으면 뒤에 온 호출자는 그 결과를 기다립니다. 전송이
//! 실패하면 구독은 완료되지 않은 상태로 남고, 기다리던 호출자가 다시 전송합니다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::traits::{ExchangeResult, Transport};
use crate::waiters::{StreamUpdate, Waiter, WaiterRegistry};
use crate::ExchangeError;

/// 구독 요청 연산자.
const SUBSCRIBE_OP: &str = "subscribe";

/// `(url, hash)` 구독. 요청 전송이 성공하면 초기화됩니다.
type Subscription = Arc<OnceCell<()>>;

/// 구독 요청을 보내고 대기자를 관리합니다.
pub struct SubscriptionRouter {
    transport: Arc<dyn Transport>,
    waiters: Arc<WaiterRegistry>,
    subscribed: Mutex<HashMap<(String, String), Subscription>>,
}

impl std::fmt::Debug for SubscriptionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRouter")
            .field(
                "subscriptions",
                &self
                    .subscribed
                    .lock()
                    .values()
                    .filter(|sub| sub.initialized())
                    .count(),
            )
            .field("waiters", &self.waiters)
            .finish()
    }
}

impl SubscriptionRouter {
    /// 새 라우터를 생성합니다.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            waiters: Arc::new(WaiterRegistry::new()),
            subscribed: Mutex::new(HashMap::new()),
        }
    }

    /// 대기자 레지스트리.
    pub fn waiters(&self) -> &Arc<WaiterRegistry> {
        &self.waiters
    }

    /// 구독 요청 페이로드를 만듭니다.
    ///
    /// `{"op": "subscribe", "args": [hash]}`에 추가 파라미터를 병합합니다.
    /// 추가 파라미터가 같은 키를 가지면 덮어씁니다.
    pub fn subscribe_request(hash: &str, params: Option<&Map<String, Value>>) -> Value {
        let mut request = json!({
            "op": SUBSCRIBE_OP,
            "args": [hash],
        });

        if let (Some(extra), Some(object)) = (params, request.as_object_mut()) {
            for (key, value) in extra {
                object.insert(key.clone(), value.clone());
            }
        }
        request
    }

    /// 해시를 구독하고 다음 업데이트를 기다립니다.
    ///
    /// 대기자는 요청 전송 전에 등록되므로 응답이 먼저 도착해도 놓치지 않습니다.
    pub async fn watch(
        &self,
        url: &str,
        hash: &str,
        params: Option<&Map<String, Value>>,
    ) -> ExchangeResult<StreamUpdate> {
        let waiter = self.waiters.register(hash);
        self.ensure_subscribed(url, hash, params).await?;
        waiter.await
    }

    /// 대기자를 등록하고 구독을 보장한 뒤 `Waiter`를 반환합니다.
    pub async fn subscribe(
        &self,
        url: &str,
        hash: &str,
        params: Option<&Map<String, Value>>,
    ) -> ExchangeResult<Waiter> {
        let waiter = self.waiters.register(hash);
        self.ensure_subscribed(url, hash, params).await?;
        Ok(waiter)
    }

    async fn ensure_subscribed(
        &self,
        url: &str,
        hash: &str,
        params: Option<&Map<String, Value>>,
    ) -> ExchangeResult<()> {
        let key = (url.to_string(), hash.to_string());
        let subscription = self.subscribed.lock().entry(key).or_default().clone();
        if subscription.initialized() {
            debug!(hash = %hash, "Reusing existing subscription");
            return Ok(());
        }

        subscription
            .get_or_try_init(|| async move {
                let request = Self::subscribe_request(hash, params);
                self.transport.send(url, &request).await?;
                info!(hash = %hash, "Subscribed");
                Ok::<(), ExchangeError>(())
            })
            .await
            .map_err(|e| {
                warn!(hash = %hash, error = %e, "Subscribe request failed");
                e
            })?;
        Ok(())
    }

    /// 해시가 해당 URL에서 구독 중인지 확인합니다.
    pub fn is_subscribed(&self, url: &str, hash: &str) -> bool {
        self.subscribed
            .lock()
            .get(&(url.to_string(), hash.to_string()))
            .is_some_and(|sub| sub.initialized())
    }

    /// URL에 구독이 하나라도 남아 있는지 확인합니다.
    pub fn has_connection(&self, url: &str) -> bool {
        self.subscribed
            .lock()
            .iter()
            .any(|((sub_url, _), sub)| sub_url == url && sub.initialized())
    }

    /// 연결이 닫혔을 때 그 연결의 구독 기록을 지웁니다.
    ///
    /// 이후의 `watch`는 다시 구독 요청을 보냅니다.
    pub fn forget_connection(&self, url: &str) -> usize {
        let mut subscribed = self.subscribed.lock();
        let before = subscribed.len();
        subscribed.retain(|(sub_url, _), _| sub_url != url);
        let forgotten = before - subscribed.len();
        if forgotten > 0 {
            debug!(forgotten, "Cleared subscriptions of closed connection");
        }
        forgotten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use feed_core::Balance;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, url: &str, payload: &Value) -> ExchangeResult<()> {
            self.sent.lock().push((url.to_string(), payload.clone()));
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _url: &str, _payload: &Value) -> ExchangeResult<()> {
            Err(crate::ExchangeError::NetworkError("down".to_string()))
        }
    }

    #[test]
    fn test_subscribe_request_merges_params() {
        let mut params = Map::new();
        params.insert("id".to_string(), json!(7));

        let request = SubscriptionRouter::subscribe_request("trade:btc-usdt", Some(&params));
        assert_eq!(
            request,
            json!({ "op": "subscribe", "args": ["trade:btc-usdt"], "id": 7 })
        );
        assert_eq!(
            SubscriptionRouter::subscribe_request("wallet", None),
            json!({ "op": "subscribe", "args": ["wallet"] })
        );
    }

    #[tokio::test]
    async fn test_subscription_sent_once_per_url() {
        let transport = Arc::new(RecordingTransport::default());
        let router = SubscriptionRouter::new(transport.clone());

        let first = router.subscribe("wss://a", "wallet", None).await.unwrap();
        let second = router.subscribe("wss://a", "wallet", None).await.unwrap();
        let _third = router.subscribe("wss://b", "wallet", None).await.unwrap();
        assert_eq!(transport.sent.lock().len(), 2);

        router
            .waiters()
            .resolve("wallet", &StreamUpdate::Balance(Arc::new(Balance::new())));
        assert!(first.await.is_ok());
        assert!(second.await.is_ok());
    }

    #[tokio::test]
    async fn test_forget_connection_resubscribes() {
        let transport = Arc::new(RecordingTransport::default());
        let router = SubscriptionRouter::new(transport.clone());

        drop(router.subscribe("wss://a", "trade", None).await.unwrap());
        assert!(router.is_subscribed("wss://a", "trade"));
        assert!(router.has_connection("wss://a"));
        assert_eq!(router.forget_connection("wss://a"), 1);
        assert!(!router.is_subscribed("wss://a", "trade"));
        assert!(!router.has_connection("wss://a"));

        drop(router.subscribe("wss://a", "trade", None).await.unwrap());
        assert_eq!(transport.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_send_is_not_remembered() {
        let router = SubscriptionRouter::new(Arc::new(FailingTransport));
        let err = router.subscribe("wss://a", "trade", None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!router.is_subscribed("wss://a", "trade"));
        assert_eq!(router.waiters().total_pending(), 0);
    }

    /// 첫 전송만 (양보 후) 실패하는 전송 계층.
    #[derive(Default)]
    struct FlakyTransport {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, _url: &str, _payload: &Value) -> ExchangeResult<()> {
            let attempt = {
                let mut attempts = self.attempts.lock();
                *attempts += 1;
                *attempts
            };
            tokio::task::yield_now().await;
            if attempt == 1 {
                return Err(ExchangeError::NetworkError("reset".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_subscriber_waits_for_in_flight_send() {
        let transport = Arc::new(FlakyTransport::default());
        let router = SubscriptionRouter::new(transport.clone());

        let (first, second) = tokio::join!(
            router.subscribe("wss://a", "trade", None),
            router.subscribe("wss://a", "trade", None),
        );

        assert!(first.is_err());
        let second = second.unwrap();
        assert_eq!(*transport.attempts.lock(), 2);
        assert!(router.is_subscribed("wss://a", "trade"));

        router
            .waiters()
            .resolve("trade", &StreamUpdate::Trades(Arc::new(Vec::new())));
        assert!(second.await.is_ok());
    }
}
