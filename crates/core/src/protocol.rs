//! Per-channel JSON messages exchanged with the server.
//!
//! Every channel speaks its own pair of externally-tagged enums, e.g.
//! `{"Subscribe": 12}` or `{"UserStatus": [12, 3]}`. Game payloads
//! (rules, room state, game state) are carried as opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::types::{ActivityState, ChannelKind, RoomId, UserNo};

/// Client → server messages on the `list` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListToServer {
    Subscribe(RoomId),
    Unsubscribe(RoomId),
    /// Request rooms whose player count lies in `user_num` (inclusive).
    GetRoomList { user_num: (u32, u32) },
}

/// Server → client messages on the `list` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ListToClient {
    Room(Value),
    RoomList(Value),
}

/// Client → server messages on the `main` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MainToServer {
    Subscribe(UserNo),
    Unsubscribe(UserNo),
    /// Presence heartbeat carrying the latest activity sample.
    Update(ActivityState),
}

/// Server → client messages on the `main` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MainToClient {
    /// User number and raw status bits.
    UserStatus(UserNo, u8),
    UserInfo(Value),
}

/// Server → client messages on the `observe` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObserveToClient {
    Room(Value),
    Game(Value),
}

/// Client → server messages on the `user` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserToServer {
    Start,
    ChangeName(String),
    Command(Value),
}

/// Server → client messages on the `user` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserToClient {
    Room(Value),
    Game(Value),
}

/// Any outbound message, tagged with the channel that carries it.
///
/// The observe channel is receive-only and has no variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    List(ListToServer),
    Main(MainToServer),
    User(UserToServer),
}

impl ClientMessage {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ClientMessage::List(_) => ChannelKind::List,
            ClientMessage::Main(_) => ChannelKind::Main,
            ClientMessage::User(_) => ChannelKind::User,
        }
    }

    /// Serialize the inner message as it goes on the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            ClientMessage::List(msg) => serde_json::to_string(msg),
            ClientMessage::Main(msg) => serde_json::to_string(msg),
            ClientMessage::User(msg) => serde_json::to_string(msg),
        }
    }
}

/// Decode an inbound text frame into the event tag and payload it is
/// delivered under.
pub fn decode_server_message(
    kind: ChannelKind,
    text: &str,
) -> Result<(&'static str, Value), ProtocolError> {
    let malformed = |source| ProtocolError::Malformed { kind, source };

    let decoded = match kind {
        ChannelKind::List => match serde_json::from_str(text).map_err(malformed)? {
            ListToClient::Room(room) => ("room", room),
            ListToClient::RoomList(rooms) => ("room_list", rooms),
        },
        ChannelKind::Main => match serde_json::from_str(text).map_err(malformed)? {
            MainToClient::UserStatus(no, status) => (
                "user_status",
                serde_json::json!({ "no": no.0, "status": status }),
            ),
            MainToClient::UserInfo(info) => ("user_info", info),
        },
        ChannelKind::Observe => match serde_json::from_str(text).map_err(malformed)? {
            ObserveToClient::Room(info) => ("room_info", info),
            ObserveToClient::Game(state) => ("game_state", state),
        },
        ChannelKind::User => match serde_json::from_str(text).map_err(malformed)? {
            UserToClient::Room(info) => ("room_info", info),
            UserToClient::Game(state) => ("game_state", state),
        },
    };

    Ok(decoded)
}
