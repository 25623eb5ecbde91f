//! Opening a set of channels as one session.
//!
//! [`SessionManager::open`] builds a [`SessionTable`]: one live handle per
//! recognised requested kind, all feeding a shared
//! [`ConnectivityTracker`]. Every tracker update and the callback it
//! triggers run under one gate, so edges are reported in the order they
//! happened even when channels live on different tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wsmux_core::events::{CONNECT, DISCONNECT, RECONNECT};
use wsmux_core::{ChannelEvent, ChannelHandle, ChannelKind, ListenerId, Transport};

use crate::activity::ActivityObserver;
use crate::catalog::{self, InitContext};
use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::heartbeat::HeartbeatGuard;
use crate::tracker::{AggregateState, ConnectivityTracker, Transition};

/// Lifecycle tags the tracker follows on every channel.
const TRACKED: [&str; 3] = [DISCONNECT, RECONNECT, CONNECT];

/// Aggregate connectivity callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// What `open` does when one channel cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConstructionPolicy {
    /// Return the error and drop everything opened so far.
    #[default]
    FailFast,
    /// Log the error, leave the kind out and keep going.
    SkipFailed,
}

/// Parameters of one [`SessionManager::open`] call.
///
/// ```rust
/// use wsmux_session::SessionConfig;
///
/// let config = SessionConfig::new(["main", "observe"])
///     .on_disconnect(|| eprintln!("connection lost"))
///     .on_reconnect(|| eprintln!("connection restored"));
/// assert_eq!(config.connections, vec!["main", "observe"]);
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Requested channel names in order. Unknown names are skipped and
    /// a repeated name replaces the earlier handle.
    pub connections: Vec<String>,
    pub on_disconnect: Callback,
    pub on_reconnect: Callback,
    pub construction: ConstructionPolicy,
}

impl SessionConfig {
    pub fn new<I, S>(connections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            connections: connections.into_iter().map(Into::into).collect(),
            on_disconnect: Arc::new(|| {}),
            on_reconnect: Arc::new(|| {}),
            construction: ConstructionPolicy::default(),
        }
    }

    /// Called when the first channel goes down.
    pub fn on_disconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Arc::new(callback);
        self
    }

    /// Called when the last down channel comes back.
    pub fn on_reconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnect = Arc::new(callback);
        self
    }

    pub fn construction(mut self, policy: ConstructionPolicy) -> Self {
        self.construction = policy;
        self
    }
}

/// Opens sessions over one transport.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    observer: Arc<dyn ActivityObserver>,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        observer: Arc<dyn ActivityObserver>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            transport,
            observer,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Open every recognised channel in `config.connections`.
    ///
    /// Handles come back immediately; connectivity is reported later via
    /// the callbacks. Under [`ConstructionPolicy::FailFast`] the first
    /// failure aborts the call and the channels opened so far are
    /// released.
    pub fn open(&self, config: SessionConfig) -> Result<SessionTable, SessionError> {
        let SessionConfig {
            connections,
            on_disconnect,
            on_reconnect,
            construction,
        } = config;

        let (state_tx, _) = watch::channel(AggregateState::Connected);
        let mut table = SessionTable {
            channels: HashMap::new(),
            aggregate: Arc::new(Aggregate {
                gate: Mutex::new(()),
                tracker: Mutex::new(ConnectivityTracker::new()),
                on_disconnect,
                on_reconnect,
                state_tx,
            }),
            cancel: CancellationToken::new(),
        };

        for requested in &connections {
            let Some(entry) = catalog::lookup(requested) else {
                tracing::debug!(requested = %requested, "Skipping unknown channel kind");
                continue;
            };

            match self.open_channel(entry, &table) {
                Ok(channel) => table.insert(entry.kind, channel),
                Err(e) => match construction {
                    ConstructionPolicy::FailFast => {
                        tracing::error!(kind = %entry.kind, error = %e, "Aborting session open");
                        return Err(e);
                    }
                    ConstructionPolicy::SkipFailed => {
                        tracing::warn!(kind = %entry.kind, error = %e, "Channel left out of session");
                    }
                },
            }
        }

        tracing::info!(channels = table.len(), requested = connections.len(), "Session opened");
        Ok(table)
    }

    fn open_channel(
        &self,
        entry: catalog::CatalogEntry,
        table: &SessionTable,
    ) -> Result<OpenChannel, SessionError> {
        let kind = entry.kind;
        let handle = (entry.construct)(self.transport.as_ref(), kind)
            .map_err(|source| SessionError::Open { kind, source })?;

        let heartbeat = (entry.init)(&InitContext {
            handle: &handle,
            observer: &self.observer,
            settings: &self.settings,
            cancel: &table.cancel,
        })?;

        let mut channel = OpenChannel {
            handle,
            subscription: None,
            _heartbeat: heartbeat,
        };
        channel.track(kind, &table.aggregate);

        tracing::info!(kind = %kind, "Channel opened");
        Ok(channel)
    }
}

/// Tracker state plus the callbacks it drives.
struct Aggregate {
    gate: Mutex<()>,
    tracker: Mutex<ConnectivityTracker>,
    on_disconnect: Callback,
    on_reconnect: Callback,
    state_tx: watch::Sender<AggregateState>,
}

impl Aggregate {
    fn tracker(&self) -> MutexGuard<'_, ConnectivityTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel_down(&self, kind: ChannelKind) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let edge = self.tracker().record_disconnect(kind);
        tracing::debug!(kind = %kind, "Channel disconnected");
        if let Some(edge) = edge {
            self.report(edge, kind);
        }
    }

    fn channel_up(&self, kind: ChannelKind) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let edge = self.tracker().record_reconnect(kind);
        if let Some(edge) = edge {
            self.report(edge, kind);
        }
    }

    /// Publish and announce an edge. Runs with the gate held.
    fn report(&self, edge: Transition, kind: ChannelKind) {
        match edge {
            Transition::Lost => {
                tracing::warn!(kind = %kind, "Connectivity degraded");
                self.state_tx.send_replace(AggregateState::Degraded);
                (self.on_disconnect)();
            }
            Transition::Restored => {
                tracing::info!(kind = %kind, "Connectivity restored");
                self.state_tx.send_replace(AggregateState::Connected);
                (self.on_reconnect)();
            }
        }
    }
}

/// One channel owned by a session table.
struct OpenChannel {
    handle: Arc<dyn ChannelHandle>,
    subscription: Option<ListenerId>,
    /// Dropped with the channel, which stops the task.
    _heartbeat: Option<HeartbeatGuard>,
}

impl OpenChannel {
    /// Feed this channel's lifecycle events into `aggregate`.
    ///
    /// The three tags share one subscription so events buffered before it
    /// existed reach the tracker in the order the channel emitted them.
    /// A first `connect` is treated like `reconnect`: it only matters if
    /// the kind is still marked down from a handle this one replaced.
    fn track(&mut self, kind: ChannelKind, aggregate: &Arc<Aggregate>) {
        let aggregate = Arc::clone(aggregate);
        let id = self.handle.on_many(
            &TRACKED,
            Arc::new(move |e: &ChannelEvent| {
                if e.tag == DISCONNECT {
                    aggregate.channel_down(kind);
                } else {
                    aggregate.channel_up(kind);
                }
            }),
        );
        self.subscription = Some(id);
    }
}

impl Drop for OpenChannel {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            for tag in TRACKED {
                self.handle.off(tag, id);
            }
        }
    }
}

/// The channels of one session and their aggregate connectivity.
///
/// Dropping the table detaches the tracker, stops every heartbeat and
/// releases the handles it holds.
pub struct SessionTable {
    channels: HashMap<ChannelKind, OpenChannel>,
    aggregate: Arc<Aggregate>,
    cancel: CancellationToken,
}

impl SessionTable {
    fn insert(&mut self, kind: ChannelKind, channel: OpenChannel) {
        if self.channels.insert(kind, channel).is_some() {
            tracing::debug!(kind = %kind, "Replaced earlier handle for repeated kind");
        }
    }

    /// The live handle for `kind`, for attaching application listeners or
    /// sending messages.
    pub fn get(&self, kind: ChannelKind) -> Option<&Arc<dyn ChannelHandle>> {
        self.channels.get(&kind).map(|c| &c.handle)
    }

    pub fn main(&self) -> Option<&Arc<dyn ChannelHandle>> {
        self.get(ChannelKind::Main)
    }

    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.channels.contains_key(&kind)
    }

    /// Opened kinds in [`ChannelKind`] order.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<_> = self.channels.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn is_disconnected(&self, kind: ChannelKind) -> bool {
        self.aggregate.tracker().is_disconnected(kind)
    }

    /// Kinds whose last lifecycle event was a disconnect.
    pub fn disconnected(&self) -> Vec<ChannelKind> {
        self.aggregate.tracker().disconnected().collect()
    }

    pub fn state(&self) -> AggregateState {
        self.aggregate.tracker().state()
    }

    /// Watch aggregate state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<AggregateState> {
        self.aggregate.state_tx.subscribe()
    }
}

impl Drop for SessionTable {
    fn drop(&mut self) {
        self.cancel.cancel();
        tracing::debug!(channels = self.channels.len(), "Session closed");
    }
}
