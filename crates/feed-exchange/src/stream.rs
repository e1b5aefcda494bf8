//! HollaEx 스트리밍 코어.
//!
//! `HollaexStream`은 주입된 `MarketResolver`/`Transport`와 선택적 `Signer`로
//! 구성됩니다. `watch_*` 호출은 구독 라우터를 통해 다음 관련 업데이트를
//! 기다리고, 전송 계층이 전달하는 이벤트는 `run`이 연결 순서대로 처리합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let (transport, events) = WsTransport::channel(&config.stream, HollaexStream::ping_payload());
//! let stream = Arc::new(HollaexStream::new(config.stream.clone(), resolver, Arc::new(transport)));
//! stream.clone().run(events);
//!
//! let book = stream.watch_order_book("BTC/USDT", Some(10), None).await?;
//! ```

use std::sync::Arc;

use feed_core::{
    now_seconds, Balance, CredentialsConfig, MarketRef, Order, OrderBook, StreamConfig, Trade,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{filter_by_since_limit, filter_orders};
use crate::handlers::StreamState;
use crate::router::SubscriptionRouter;
use crate::signer::{ExpiryCache, PrivateChannel, Signer};
use crate::topic::{message_hash, Topic};
use crate::traits::{ExchangeResult, MarketResolver, Transport, TransportEvent};
use crate::waiters::StreamUpdate;
use crate::ExchangeError;

/// 구독 요청에 병합되는 추가 파라미터.
pub type Params = Map<String, Value>;

/// 하트비트 연산자.
const PING_OP: &str = "ping";

/// 스트리밍 코어.
pub struct HollaexStream {
    pub(crate) config: StreamConfig,
    pub(crate) resolver: Arc<dyn MarketResolver>,
    pub(crate) router: SubscriptionRouter,
    pub(crate) state: RwLock<StreamState>,
    signer: Option<Arc<Signer>>,
    expiries: ExpiryCache,
    pub(crate) last_pong: Mutex<Option<i64>>,
    pub(crate) errors: broadcast::Sender<ExchangeError>,
}

impl std::fmt::Debug for HollaexStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HollaexStream")
            .field("ws_url", &self.config.ws_url)
            .field("router", &self.router)
            .field("signer", &self.signer)
            .finish()
    }
}

impl HollaexStream {
    /// 새 코어를 생성합니다. 인증 채널을 쓰려면 `with_signer`로 서명기를
    /// 지정해야 합니다.
    pub fn new(
        config: StreamConfig,
        resolver: Arc<dyn MarketResolver>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (errors, _) = broadcast::channel(config.channel_capacity.max(1));
        let router = SubscriptionRouter::new(transport);
        let state = StreamState::from_config(&config).with_waiters(router.waiters().clone());
        Self {
            state: RwLock::new(state),
            expiries: ExpiryCache::new(config.timeout_ms),
            router,
            signer: None,
            last_pong: Mutex::new(None),
            errors,
            resolver,
            config,
        }
    }

    /// 서명기를 지정합니다.
    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// 자격증명이 모두 있으면 서명기를 지정합니다.
    pub fn with_credentials(self, credentials: &CredentialsConfig) -> ExchangeResult<Self> {
        if !credentials.is_complete() {
            debug!("No credentials configured, private channels disabled");
            return Ok(self);
        }
        Ok(self.with_signer(Signer::from_credentials(credentials)?))
    }

    /// 전송 계층의 주기적 핑에 쓸 하트비트 페이로드.
    pub fn ping_payload() -> Value {
        json!({ "op": PING_OP })
    }

    /// 마지막 하트비트 응답 시각 (epoch 밀리초).
    pub fn last_pong(&self) -> Option<i64> {
        *self.last_pong.lock()
    }

    /// 메시지 처리 밖으로 전파된 에러를 구독합니다.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ExchangeError> {
        self.errors.subscribe()
    }

    /// 구독 라우터.
    pub fn router(&self) -> &SubscriptionRouter {
        &self.router
    }

    /// 스트림 설정.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    // ---- 상태 조회 ----

    /// 심볼의 현재 호가창 사본.
    pub fn order_book(&self, symbol: &str) -> Option<OrderBook> {
        self.state.read().order_book(symbol).cloned()
    }

    /// 심볼의 체결 캐시 사본.
    pub fn trades(&self, symbol: &str) -> Vec<Trade> {
        self.state.read().trades(symbol)
    }

    /// 주문 캐시 사본.
    pub fn orders(&self) -> Vec<Order> {
        self.state.read().orders()
    }

    /// 현재 잔고 사본.
    pub fn balance(&self) -> Balance {
        self.state.read().balance().clone()
    }

    // ---- watch ----

    /// 다음 호가창 스냅샷을 기다립니다. 면당 `limit` 레벨로 자릅니다.
    pub async fn watch_order_book(
        &self,
        symbol: &str,
        limit: Option<usize>,
        params: Option<&Params>,
    ) -> ExchangeResult<OrderBook> {
        let market = self.market(symbol)?;
        let hash = message_hash(Topic::OrderBook, Some(&market.id));
        let url = self.topic_url(Topic::OrderBook)?;

        match self.router.watch(&url, &hash, params).await? {
            StreamUpdate::OrderBook(book) => Ok(book.limit(limit)),
            other => Err(unexpected_update(&hash, &other)),
        }
    }

    /// 다음 체결 업데이트를 기다립니다.
    ///
    /// 반환값은 마켓 체결 캐시에서 `since` 이후 가장 최근 `limit`개입니다.
    pub async fn watch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<usize>,
        params: Option<&Params>,
    ) -> ExchangeResult<Vec<Trade>> {
        let market = self.market(symbol)?;
        let hash = message_hash(Topic::Trade, Some(&market.id));
        let url = self.topic_url(Topic::Trade)?;

        match self.router.watch(&url, &hash, params).await? {
            StreamUpdate::Trades(trades) => {
                Ok(filter_by_since_limit(trades.as_slice(), since, limit))
            }
            other => Err(unexpected_update(&hash, &other)),
        }
    }

    /// 다음 주문 업데이트를 기다립니다 (인증 필요).
    ///
    /// `symbol`이 없으면 모든 마켓의 주문을 대상으로 합니다.
    pub async fn watch_orders(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<usize>,
        params: Option<&Params>,
    ) -> ExchangeResult<Vec<Order>> {
        let market = symbol.map(|s| self.market(s)).transpose()?;
        let hash = message_hash(Topic::Order, market.as_ref().map(|m| m.id.as_str()));
        let url = self.topic_url(Topic::Order)?;

        match self.router.watch(&url, &hash, params).await? {
            StreamUpdate::Orders(orders) => Ok(filter_orders(
                orders.as_slice(),
                market.as_ref().map(|m| m.symbol.as_str()),
                since,
                limit,
            )),
            other => Err(unexpected_update(&hash, &other)),
        }
    }

    /// 다음 잔고 업데이트를 기다립니다 (인증 필요).
    pub async fn watch_balance(&self, params: Option<&Params>) -> ExchangeResult<Balance> {
        let hash = message_hash(Topic::Wallet, None);
        let url = self.topic_url(Topic::Wallet)?;

        match self.router.watch(&url, &hash, params).await? {
            StreamUpdate::Balance(balance) => Ok(Balance::clone(&balance)),
            other => Err(unexpected_update(&hash, &other)),
        }
    }

    /// 정규 심볼 또는 와이어 식별자로 마켓을 찾습니다.
    fn market(&self, symbol: &str) -> ExchangeResult<MarketRef> {
        self.resolver
            .market(symbol)
            .or_else(|| self.resolver.resolve_market(symbol))
            .ok_or_else(|| ExchangeError::InvalidSymbol(symbol.to_string()))
    }

    /// 토픽을 구독할 연결 URL. 비공개 토픽은 채널별로 서명된 URL을 씁니다.
    fn topic_url(&self, topic: Topic) -> ExchangeResult<String> {
        if !topic.is_private() {
            return Ok(self.config.ws_url.clone());
        }
        let channel = match topic {
            Topic::Wallet => PrivateChannel::Balance,
            _ => PrivateChannel::Orders,
        };
        self.private_url(channel)
    }

    /// 비공개 채널의 서명된 URL을 만듭니다.
    ///
    /// 메모이제이션된 만료 토큰의 연결이 아직 살아 있으면 토큰이 지났더라도
    /// 같은 URL을 재사용합니다.
    pub fn private_url(&self, channel: PrivateChannel) -> ExchangeResult<String> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Authentication("requires apiKey and secret credentials".to_string())
        })?;

        if let Some(expires) = self.expiries.current(channel) {
            let url = signer.signed_url(&self.config.ws_url, &expires)?;
            if self.router.has_connection(&url) {
                return Ok(url);
            }
        }

        let expires = self.expiries.get_or_create(channel, now_seconds());
        signer.signed_url(&self.config.ws_url, &expires)
    }

    /// 전송 이벤트를 순서대로 처리하는 태스크를 시작합니다.
    ///
    /// 메시지 처리 밖으로 전파된 에러는 로그를 남기고 `subscribe_errors`
    /// 구독자에게 전달합니다. 연결 종료 시 그 연결의 구독 기록을 지워 다음
    /// `watch`가 다시 구독하도록 합니다.
    pub fn run(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(event);
            }
            info!("Transport event channel closed");
        })
    }

    /// 전송 이벤트 하나를 처리합니다.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Frame { url, text } => {
                if let Err(e) = self.handle_text(&text) {
                    error!(url = %redact_url(&url), error = %e, "Message handling failed");
                    self.publish_error(e);
                }
            }
            TransportEvent::Closed { url } => {
                warn!(url = %redact_url(&url), "Connection closed");
                self.router.forget_connection(&url);
            }
            TransportEvent::Error { url, error } => {
                error!(url = %redact_url(&url), error = %error, "Connection error");
                self.publish_error(error);
            }
        }
    }

    fn publish_error(&self, error: ExchangeError) {
        // 수신자가 없으면 버립니다
        let _ = self.errors.send(error);
    }
}

/// 서명 쿼리 문자열을 제외한 URL.
pub fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn unexpected_update(hash: &str, update: &StreamUpdate) -> ExchangeError {
    ExchangeError::Protocol(format!("unexpected update for {}: {:?}", hash, update))
}
