//! The fixed set of channels a session can open.
//!
//! Each [`ChannelKind`] maps to a [`CatalogEntry`]: how to construct its
//! handle and what to start alongside it. Adding a kind means adding a
//! variant and a match arm here; the session manager only ever goes
//! through [`lookup`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wsmux_core::{ChannelHandle, ChannelKind, Transport, TransportError};

use crate::activity::ActivityObserver;
use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::heartbeat::{spawn_heartbeat, HeartbeatGuard};

/// What an initializer gets to work with.
pub struct InitContext<'a> {
    pub handle: &'a Arc<dyn ChannelHandle>,
    pub observer: &'a Arc<dyn ActivityObserver>,
    pub settings: &'a SessionSettings,
    /// Session-wide token; background work should hang off a child of it.
    pub cancel: &'a CancellationToken,
}

pub type Construct = fn(&dyn Transport, ChannelKind) -> Result<Arc<dyn ChannelHandle>, TransportError>;

pub type Init = fn(&InitContext<'_>) -> Result<Option<HeartbeatGuard>, SessionError>;

#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub kind: ChannelKind,
    pub construct: Construct,
    pub init: Init,
}

/// Resolve a requested channel name. Unknown names have no entry.
pub fn lookup(requested: &str) -> Option<CatalogEntry> {
    ChannelKind::from_tag(requested).map(entry)
}

/// The entry for a known kind.
pub fn entry(kind: ChannelKind) -> CatalogEntry {
    match kind {
        ChannelKind::Main => CatalogEntry {
            kind,
            construct: open_channel,
            init: start_heartbeat,
        },
        ChannelKind::List | ChannelKind::Observe | ChannelKind::User => CatalogEntry {
            kind,
            construct: open_channel,
            init: no_init,
        },
    }
}

fn open_channel(
    transport: &dyn Transport,
    kind: ChannelKind,
) -> Result<Arc<dyn ChannelHandle>, TransportError> {
    transport.open(kind)
}

fn no_init(_: &InitContext<'_>) -> Result<Option<HeartbeatGuard>, SessionError> {
    Ok(None)
}

fn start_heartbeat(ctx: &InitContext<'_>) -> Result<Option<HeartbeatGuard>, SessionError> {
    spawn_heartbeat(
        ctx.handle,
        Arc::clone(ctx.observer),
        ctx.settings.heartbeat_period,
        ctx.cancel.child_token(),
    )
    .map(Some)
}
