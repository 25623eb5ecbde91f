use crate::types::ChannelKind;

/// Errors raised by a [`Transport`](crate::Transport) or a live channel handle.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel could not be established or its task could not start.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The channel task has exited; nothing more can be sent.
    #[error("Channel {0} is closed")]
    Closed(ChannelKind),

    /// The operation does not exist on this channel kind.
    #[error("Channel {kind} does not support {operation}")]
    Unsupported {
        kind: ChannelKind,
        operation: &'static str,
    },

    /// A message built for one channel was handed to another.
    #[error("Message for {message} channel sent on {channel} channel")]
    KindMismatch {
        channel: ChannelKind,
        message: ChannelKind,
    },

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An inbound frame that could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed {kind} message: {source}")]
    Malformed {
        kind: ChannelKind,
        #[source]
        source: serde_json::Error,
    },
}

/// A string that names no known channel kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel kind: {0}")]
pub struct UnknownChannelKind(pub String);

/// Invalid or missing configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
