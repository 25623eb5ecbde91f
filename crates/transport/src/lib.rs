//! WebSocket transport for `wsmux` channels.
//!
//! [`WsTransport`] opens one WebSocket per channel at
//! `{base}/ws/{wire_path}` and keeps it alive: each channel runs a task
//! that connects, pumps frames and reconnects with exponential backoff
//! until its [`WsChannel`] handle is dropped or the server closes it.

pub mod channel;
pub mod client;
pub mod processor;
pub mod reconnect;

pub use channel::{WsChannel, WsTransport};
pub use client::{ChannelClient, ChannelClientError, ChannelConnection};
pub use reconnect::{Backoff, ReconnectConfig};
