//! The boundary between the session layer and whatever actually moves
//! bytes.
//!
//! A [`Transport`] opens one [`ChannelHandle`] per [`ChannelKind`]. The
//! handle is returned before the connection exists; connectivity is
//! reported afterwards through its events (see [`crate::events`]).

use std::sync::Arc;

use crate::error::TransportError;
use crate::events::{Listener, ListenerId};
use crate::protocol::{ClientMessage, MainToServer};
use crate::types::{ActivityState, ChannelKind};

/// A live, independently reconnecting channel.
///
/// Dropping the last reference releases the channel.
pub trait ChannelHandle: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Subscribe to an event tag.
    fn on(&self, tag: &str, listener: Listener) -> ListenerId;

    /// Subscribe one listener to several tags. Events buffered for any of
    /// them are replayed in the order they were emitted.
    fn on_many(&self, tags: &[&str], listener: Listener) -> ListenerId;

    /// Unsubscribe. Returns `false` if `id` was not subscribed to `tag`.
    fn off(&self, tag: &str, id: ListenerId) -> bool;

    /// Queue a message for the server.
    fn send(&self, message: ClientMessage) -> Result<(), TransportError>;

    /// Forward the user's current activity. Only the main channel accepts it.
    fn update(&self, activity: ActivityState) -> Result<(), TransportError> {
        match self.kind() {
            ChannelKind::Main => self.send(ClientMessage::Main(MainToServer::Update(activity))),
            kind => Err(TransportError::Unsupported {
                kind,
                operation: "update",
            }),
        }
    }
}

/// Opens channels. Implementations must not wait for the network in
/// [`open`](Transport::open).
pub trait Transport: Send + Sync {
    fn open(&self, kind: ChannelKind) -> Result<Arc<dyn ChannelHandle>, TransportError>;
}
