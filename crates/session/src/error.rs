use wsmux_core::{ChannelKind, TransportError};

/// Errors returned by [`SessionManager::open`](crate::SessionManager::open).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport refused to open the channel.
    #[error("Failed to open {kind} channel: {source}")]
    Open {
        kind: ChannelKind,
        #[source]
        source: TransportError,
    },

    /// The channel opened but its initializer could not run.
    #[error("Failed to initialise {kind} channel: {reason}")]
    Init { kind: ChannelKind, reason: String },
}

impl SessionError {
    pub fn kind(&self) -> ChannelKind {
        match self {
            SessionError::Open { kind, .. } | SessionError::Init { kind, .. } => *kind,
        }
    }
}
