//! Shared vocabulary for the `wsmux` channel multiplexer.
//!
//! - [`types`]: channel kinds, activity state and domain ids.
//! - [`protocol`]: per-channel JSON wire messages.
//! - [`events`]: channel event tags and the buffering [`EventEmitter`].
//! - [`handle`]: the [`Transport`] / [`ChannelHandle`] boundary traits.
//! - [`config`]: environment helpers shared by every crate.
//! - [`error`]: error types raised at the transport boundary.

pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod protocol;
pub mod types;

pub use error::{ConfigError, ProtocolError, TransportError, UnknownChannelKind};
pub use events::{ChannelEvent, EventEmitter, Listener, ListenerId};
pub use handle::{ChannelHandle, Transport};
pub use protocol::ClientMessage;
pub use types::{ActivityState, ChannelKind};
