//! Channel kinds, user activity and the small domain ids carried by
//! channel messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownChannelKind;

/// One logical connection the client can open.
///
/// The set is closed: adding a kind means adding a variant here and a
/// catalog entry in `wsmux-session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Room listing updates.
    List,
    /// Presence and user status; receives heartbeats.
    Main,
    /// Spectating a room.
    Observe,
    /// The user's own room.
    User,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::List,
        ChannelKind::Main,
        ChannelKind::Observe,
        ChannelKind::User,
    ];

    /// Name used in session requests and logs.
    pub fn tag(self) -> &'static str {
        match self {
            ChannelKind::List => "list",
            ChannelKind::Main => "main",
            ChannelKind::Observe => "observe",
            ChannelKind::User => "user",
        }
    }

    /// Path segment of the server endpoint, i.e. `/ws/{wire_path}`.
    ///
    /// The user's channel is served from the room endpoint.
    pub fn wire_path(self) -> &'static str {
        match self {
            ChannelKind::User => "room",
            other => other.tag(),
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ChannelKind {
    type Err = UnknownChannelKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownChannelKind(s.to_owned()))
    }
}

/// Whether the user is currently interacting with the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityState {
    Active,
    Idle,
}

impl ActivityState {
    pub fn is_active(self) -> bool {
        matches!(self, ActivityState::Active)
    }
}

/// Server-assigned user number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserNo(pub u32);

/// Short room id, only unique while the room is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in ChannelKind::ALL {
            assert_eq!(kind.tag().parse::<ChannelKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_matches!("lobby".parse::<ChannelKind>(), Err(UnknownChannelKind(s)) if s == "lobby");
        assert_eq!(ChannelKind::from_tag("MAIN"), None);
    }

    #[test]
    fn user_channel_uses_room_endpoint() {
        assert_eq!(ChannelKind::User.wire_path(), "room");
        assert_eq!(ChannelKind::Observe.wire_path(), "observe");
    }

    #[test]
    fn kinds_serialize_as_lowercase_tags() {
        let json = serde_json::to_string(&ChannelKind::Observe).unwrap();
        assert_eq!(json, "\"observe\"");
        let state: ActivityState = serde_json::from_str("\"idle\"").unwrap();
        assert!(!state.is_active());
    }
}
