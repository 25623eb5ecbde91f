//! Frame pump for one live channel connection.
//!
//! Writes queued [`ClientMessage`]s as JSON text frames and turns inbound
//! text frames into [`ChannelEvent`]s via
//! [`decode_server_message`]. Returns when the connection ends, telling
//! the caller whether to reconnect.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use wsmux_core::protocol::decode_server_message;
use wsmux_core::{ChannelEvent, ChannelKind, ClientMessage, EventEmitter};

use crate::client::WsStream;

/// Why [`pump_messages`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The connection broke; the channel should reconnect.
    Lost,
    /// The server closed the channel on purpose.
    Closed,
    /// The handle was dropped or the task cancelled.
    Cancelled,
}

/// Drive one connection until it ends.
pub async fn pump_messages(
    ws_stream: WsStream,
    kind: ChannelKind,
    emitter: &EventEmitter,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    cancel: &CancellationToken,
) -> PumpExit {
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return PumpExit::Cancelled;
            }
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::Cancelled;
                };
                let json = match message.encode() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(kind = %kind, error = %e, "Dropping unencodable message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json)).await {
                    tracing::warn!(kind = %kind, error = %e, "WebSocket send error");
                    return PumpExit::Lost;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text_message(kind, &text, emitter);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled automatically by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(kind = %kind, ?frame, "Server closed channel");
                    return PumpExit::Closed;
                }
                Some(Ok(Message::Binary(_) | Message::Frame(_))) => {
                    tracing::trace!(kind = %kind, "Ignoring non-text frame");
                }
                Some(Err(e)) => {
                    tracing::warn!(kind = %kind, error = %e, "WebSocket receive error");
                    return PumpExit::Lost;
                }
                None => {
                    tracing::info!(kind = %kind, "WebSocket stream exhausted");
                    return PumpExit::Lost;
                }
            }
        }
    }
}

/// Decode one text frame and emit it under its tag.
///
/// Frames that do not decode are logged and skipped.
pub fn handle_text_message(kind: ChannelKind, text: &str, emitter: &EventEmitter) {
    match decode_server_message(kind, text) {
        Ok((tag, payload)) => emitter.emit(ChannelEvent::new(tag, payload)),
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, raw = %text, "Unknown or malformed message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collect(emitter: &EventEmitter, tag: &str) -> Arc<Mutex<Vec<ChannelEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        emitter.on(
            tag,
            Arc::new(move |e: &ChannelEvent| sink.lock().unwrap().push(e.clone())),
        );
        seen
    }

    #[test]
    fn decoded_frames_are_emitted_under_their_tag() {
        let emitter = EventEmitter::new();
        let statuses = collect(&emitter, "user_status");

        handle_text_message(ChannelKind::Main, r#"{"UserStatus":[10,3]}"#, &emitter);

        let seen = statuses.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload["no"], 10);
    }

    #[test]
    fn malformed_frames_are_skipped() {
        let emitter = EventEmitter::new();
        let rooms = collect(&emitter, "room_info");

        handle_text_message(ChannelKind::Observe, "not json", &emitter);
        handle_text_message(ChannelKind::Observe, r#"{"Chat":"hi"}"#, &emitter);

        assert!(rooms.lock().unwrap().is_empty());
    }
}
