//! WebSocket endpoint of a single channel.
//!
//! [`ChannelClient`] holds the resolved URL for one [`ChannelKind`].
//! Call [`ChannelClient::connect`] to establish a live
//! [`ChannelConnection`].

use tokio_tungstenite::{connect_async, MaybeTlsStream};
use wsmux_core::ChannelKind;

pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection target for one channel.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    kind: ChannelKind,
    url: String,
}

/// A live WebSocket connection for one channel.
pub struct ChannelConnection {
    pub kind: ChannelKind,
    pub ws_stream: WsStream,
}

impl ChannelClient {
    /// Target `{base_url}/ws/{wire_path}`.
    ///
    /// `http://` and `https://` bases are mapped to `ws://` and `wss://`.
    pub fn new(base_url: &str, kind: ChannelKind) -> Self {
        Self {
            kind,
            url: channel_url(base_url, kind),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the WebSocket.
    pub async fn connect(&self) -> Result<ChannelConnection, ChannelClientError> {
        let (ws_stream, _response) = connect_async(self.url.as_str()).await.map_err(|e| {
            ChannelClientError::Connection(format!("Failed to connect to {}: {e}", self.url))
        })?;

        tracing::info!(kind = %self.kind, url = %self.url, "Channel connected");

        Ok(ChannelConnection {
            kind: self.kind,
            ws_stream,
        })
    }
}

fn channel_url(base_url: &str, kind: ChannelKind) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws/{}", kind.wire_path())
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ChannelClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_bases_become_websocket_urls() {
        assert_eq!(
            channel_url("https://mighty.example/", ChannelKind::Main),
            "wss://mighty.example/ws/main"
        );
        assert_eq!(
            channel_url("http://localhost:8080", ChannelKind::List),
            "ws://localhost:8080/ws/list"
        );
    }

    #[test]
    fn websocket_bases_are_kept() {
        let client = ChannelClient::new("ws://127.0.0.1:9000", ChannelKind::User);
        assert_eq!(client.url(), "ws://127.0.0.1:9000/ws/room");
        assert_eq!(client.kind(), ChannelKind::User);
    }
}
