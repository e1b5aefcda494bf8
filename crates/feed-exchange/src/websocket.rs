//! tokio-tungstenite 기반 WebSocket 전송 계층.
//!
//! URL별로 물리 연결 하나를 지연 생성하고, 연결마다 태스크 하나가
//! 수신/송신/하트비트를 `tokio::select!`로 처리합니다. 수신한 텍스트
//! 프레임은 `TransportEvent::Frame`으로 코어에 전달됩니다.
//!
//! 재연결은 하지 않습니다. 연결이 끊기면 송신 채널을 먼저 닫은 뒤
//! `TransportEvent::Closed`를 보내고, 다음 `send`가 새 연결을 엽니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_core::StreamConfig;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::stream::redact_url;
use crate::traits::{ExchangeResult, Transport, TransportEvent};
use crate::ExchangeError;

/// WebSocket 전송 계층.
pub struct WsTransport {
    connections: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Message>>>>,
    events: mpsc::Sender<TransportEvent>,
    ping_text: String,
    ping_interval: Duration,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("ping_interval", &self.ping_interval)
            .finish()
    }
}

impl WsTransport {
    /// 새 전송 계층을 생성합니다.
    ///
    /// `ping_payload`는 `ping_interval`마다 텍스트 프레임으로 전송됩니다.
    pub fn new(
        events: mpsc::Sender<TransportEvent>,
        ping_payload: &Value,
        ping_interval: Duration,
    ) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            events,
            ping_text: ping_payload.to_string(),
            ping_interval: ping_interval.max(Duration::from_secs(1)),
        }
    }

    /// 설정으로 전송 계층과 이벤트 수신기를 함께 만듭니다.
    pub fn channel(
        config: &StreamConfig,
        ping_payload: &Value,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let transport = Self::new(
            tx,
            ping_payload,
            Duration::from_secs(config.ping_interval_secs),
        );
        (transport, rx)
    }

    /// URL의 송신 채널을 반환합니다. 연결이 없거나 끊겼으면 새로 연결합니다.
    async fn connection(&self, url: &str) -> ExchangeResult<mpsc::UnboundedSender<Message>> {
        let mut connections = self.connections.lock().await;
        if let Some(sender) = connections.get(url) {
            if !sender.is_closed() {
                return Ok(sender.clone());
            }
            connections.remove(url);
        }

        info!(url = %redact_url(url), "Connecting WebSocket");
        let (ws_stream, _) = connect_async(url).await.map_err(|e| {
            error!(url = %redact_url(url), error = %e, "WebSocket connect failed");
            ExchangeError::from(e)
        })?;
        info!(url = %redact_url(url), "WebSocket connected");

        let (tx, rx) = mpsc::unbounded_channel();
        connections.insert(url.to_string(), tx.clone());

        tokio::spawn(run_connection(
            url.to_string(),
            ws_stream,
            rx,
            self.events.clone(),
            self.ping_text.clone(),
            self.ping_interval,
        ));
        Ok(tx)
    }

    /// 열려 있는 연결 수.
    pub async fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .await
            .values()
            .filter(|sender| !sender.is_closed())
            .count()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, url: &str, payload: &Value) -> ExchangeResult<()> {
        let text = serde_json::to_string(payload)?;
        debug!(url = %redact_url(url), payload = %text, "Sending");

        let sender = self.connection(url).await?;
        let Err(mpsc::error::SendError(message)) = sender.send(Message::Text(text)) else {
            return Ok(());
        };

        // 연결 태스크가 방금 종료됨
        debug!(url = %redact_url(url), "Connection closed before send, reconnecting");
        self.connection(url)
            .await?
            .send(message)
            .map_err(|_| ExchangeError::Disconnected(redact_url(url).to_string()))
    }
}

/// 연결 하나의 수신/송신/하트비트 루프.
///
/// 루프가 끝나면 이벤트를 보내기 전에 송신 채널부터 닫아, 이벤트 채널이
/// 가득 차 있어도 `WsTransport`가 끊긴 연결을 재사용하지 않게 합니다.
async fn run_connection<S>(
    url: String,
    ws_stream: WebSocketStream<S>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::Sender<TransportEvent>,
    ping_text: String,
    ping_every: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();
    let mut ping_interval = interval_at(Instant::now() + ping_every, ping_every);

    let failure: Option<ExchangeError> = loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame = TransportEvent::Frame { url: url.clone(), text };
                        if events.send(frame).await.is_err() {
                            debug!("Event receiver dropped");
                            break None;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        warn!(url = %redact_url(&url), "Server closed connection");
                        break None;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(url = %redact_url(&url), error = %e, "WebSocket receive error");
                        break Some(e.into());
                    }
                    None => {
                        warn!(url = %redact_url(&url), "WebSocket stream ended");
                        break None;
                    }
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(message) => {
                        if let Err(e) = write.send(message).await {
                            error!(url = %redact_url(&url), error = %e, "WebSocket send error");
                            break Some(e.into());
                        }
                    }
                    None => {
                        debug!(url = %redact_url(&url), "Transport dropped, closing connection");
                        let _ = write.close().await;
                        break None;
                    }
                }
            }
            _ = ping_interval.tick() => {
                debug!(url = %redact_url(&url), "Sending ping");
                if let Err(e) = write.send(Message::Text(ping_text.clone())).await {
                    error!(url = %redact_url(&url), error = %e, "Ping send failed");
                    break Some(e.into());
                }
            }
        }
    };

    outbound.close();
    drop(outbound);

    if let Some(error) = failure {
        let _ = events
            .send(TransportEvent::Error {
                url: url.clone(),
                error,
            })
            .await;
    }
    let _ = events.send(TransportEvent::Closed { url }).await;
}
