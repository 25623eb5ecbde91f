//! [`WsTransport`] and its channel handles.
//!
//! Each [`WsChannel`] owns a task running the connect -> pump -> reconnect
//! loop and reports its lifecycle through the channel's
//! [`EventEmitter`]:
//!
//! - `start` once, when the task begins,
//! - `connect` on the first successful connection,
//! - `disconnect` when a connection is lost or the first attempt fails,
//! - `reconnect` when a connection comes back after a `disconnect`,
//! - `stop` when the server closes the channel or the handle is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wsmux_core::events::{CONNECT, DISCONNECT, RECONNECT, START, STOP};
use wsmux_core::{
    ChannelEvent, ChannelHandle, ChannelKind, ClientMessage, EventEmitter, Listener, ListenerId,
    Transport, TransportError,
};

use crate::client::ChannelClient;
use crate::processor::{pump_messages, PumpExit};
use crate::reconnect::{Backoff, ReconnectConfig};

/// Opens one WebSocket per channel against a single server.
#[derive(Debug, Clone)]
pub struct WsTransport {
    base_url: String,
    reconnect: ReconnectConfig,
}

impl WsTransport {
    /// `base_url` is the server origin, e.g. `https://mighty.example`.
    pub fn new(base_url: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        Self {
            base_url: base_url.into(),
            reconnect,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a channel and return the concrete handle.
    ///
    /// Requires a Tokio runtime; the connection is made in the background.
    pub fn open_channel(&self, kind: ChannelKind) -> Result<WsChannel, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Connection(format!("no Tokio runtime: {e}")))?;

        let client = ChannelClient::new(&self.base_url, kind);
        let emitter = Arc::new(EventEmitter::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tracing::debug!(kind = %kind, url = %client.url(), "Spawning channel task");
        runtime.spawn(run_channel(
            client,
            Arc::clone(&emitter),
            rx,
            self.reconnect.clone(),
            cancel.clone(),
        ));

        Ok(WsChannel {
            kind,
            emitter,
            outbound: tx,
            cancel,
        })
    }
}

impl Transport for WsTransport {
    fn open(&self, kind: ChannelKind) -> Result<Arc<dyn ChannelHandle>, TransportError> {
        let channel = self.open_channel(kind)?;
        Ok(Arc::new(channel))
    }
}

/// Handle to one WebSocket channel. Dropping it stops the channel task.
pub struct WsChannel {
    kind: ChannelKind,
    emitter: Arc<EventEmitter>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    cancel: CancellationToken,
}

impl WsChannel {
    /// Whether the channel task has exited.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Stop the channel task now rather than on drop.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl ChannelHandle for WsChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn on(&self, tag: &str, listener: Listener) -> ListenerId {
        self.emitter.on(tag, listener)
    }

    fn on_many(&self, tags: &[&str], listener: Listener) -> ListenerId {
        self.emitter.on_many(tags, listener)
    }

    fn off(&self, tag: &str, id: ListenerId) -> bool {
        self.emitter.off(tag, id)
    }

    /// Queue `message`. Messages queued while disconnected go out after
    /// the next successful reconnect.
    fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        if message.kind() != self.kind {
            return Err(TransportError::KindMismatch {
                channel: self.kind,
                message: message.kind(),
            });
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed(self.kind))
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Channel task: connect -> pump -> reconnect, until cancelled or closed.
///
/// One loop covers both a first connection that fails and a live one
/// that drops. `disconnect` goes out once per outage, and the next
/// successful connection is announced as `reconnect`.
async fn run_channel(
    client: ChannelClient,
    emitter: Arc<EventEmitter>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    config: ReconnectConfig,
    cancel: CancellationToken,
) {
    let kind = client.kind();
    emitter.emit(ChannelEvent::lifecycle(START));

    let mut backoff = Backoff::new(config);
    let mut up = CONNECT;

    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.connect() => result,
        };

        match attempt {
            Ok(conn) => {
                backoff.connected();
                emitter.emit(ChannelEvent::lifecycle(up));
                match pump_messages(conn.ws_stream, kind, &emitter, &mut outbound, &cancel).await {
                    PumpExit::Lost => {
                        tracing::info!(kind = %kind, "Connection lost, reconnecting");
                        emitter.emit(ChannelEvent::lifecycle(DISCONNECT));
                        up = RECONNECT;
                    }
                    PumpExit::Closed | PumpExit::Cancelled => break,
                }
            }
            Err(e) => {
                if up == CONNECT {
                    emitter.emit(ChannelEvent::lifecycle(DISCONNECT));
                    up = RECONNECT;
                }
                let wait = backoff.failed();
                tracing::warn!(
                    kind = %kind,
                    error = %e,
                    failures = backoff.failures(),
                    wait_ms = wait.as_millis() as u64,
                    "Connection attempt failed",
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }

    outbound.close();
    emitter.emit(ChannelEvent::lifecycle(STOP));
    tracing::info!(kind = %kind, "Channel stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use wsmux_core::protocol::ListToServer;
    use wsmux_core::types::RoomId;
    use wsmux_core::ActivityState;

    fn unreachable_transport() -> WsTransport {
        WsTransport::new(
            "ws://127.0.0.1:9",
            ReconnectConfig {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                multiplier: 2.0,
            },
        )
    }

    #[test]
    fn open_without_runtime_fails() {
        let result = unreachable_transport().open(ChannelKind::List);
        assert_matches!(result.err(), Some(TransportError::Connection(_)));
    }

    #[tokio::test]
    async fn send_checks_message_kind() {
        let channel = unreachable_transport().open_channel(ChannelKind::Main).unwrap();

        assert_matches!(
            channel.send(ClientMessage::List(ListToServer::Unsubscribe(RoomId(1)))),
            Err(TransportError::KindMismatch {
                channel: ChannelKind::Main,
                message: ChannelKind::List
            })
        );
        assert!(channel.update(ActivityState::Active).is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_reports_disconnect_then_stop() {
        let channel = unreachable_transport().open_channel(ChannelKind::List).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for tag in [START, DISCONNECT, STOP] {
            let tx = tx.clone();
            channel.on(
                tag,
                Arc::new(move |e: &ChannelEvent| {
                    let _ = tx.send(e.tag.clone());
                }),
            );
        }

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some(START));
        let second = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(second.as_deref(), Some(DISCONNECT));

        channel.close();
        let last = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(last.as_deref(), Some(STOP));

        assert!(channel.is_closed());
        assert_matches!(
            channel.send(ClientMessage::List(ListToServer::Subscribe(RoomId(3)))),
            Err(TransportError::Closed(ChannelKind::List))
        );
    }
}
