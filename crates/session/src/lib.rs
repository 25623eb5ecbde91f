//! Session multiplexer for `wsmux` channels.
//!
//! [`SessionManager::open`] resolves the requested channel kinds against
//! the [`catalog`], opens each through a [`Transport`](wsmux_core::Transport),
//! wires the [`ConnectivityTracker`] onto their lifecycle events and hands
//! back a [`SessionTable`]. The application learns about connectivity only
//! through two callbacks, each fired on an aggregate edge:
//!
//! - `on_disconnect` when the first channel goes down,
//! - `on_reconnect` when the last down channel comes back.
//!
//! The main channel additionally gets a heartbeat that forwards the user's
//! [`ActivityState`](wsmux_core::ActivityState) on a fixed period.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod manager;
pub mod tracker;

pub use activity::{ActivityObserver, FixedActivity, IdleTracker};
pub use config::SessionSettings;
pub use error::SessionError;
pub use heartbeat::{spawn_heartbeat, HeartbeatGuard};
pub use manager::{ConstructionPolicy, SessionConfig, SessionManager, SessionTable};
pub use tracker::{AggregateState, ConnectivityTracker, Transition};
