//! Channel events and the per-handle listener registry.
//!
//! A channel handle reports its lifecycle ([`START`], [`CONNECT`],
//! [`RECONNECT`], [`DISCONNECT`], [`STOP`]) and every decoded server
//! message through one [`EventEmitter`]. Events emitted for a tag nobody
//! listens to yet are buffered and replayed to the first listener that
//! subscribes to that tag, so nothing is lost between opening a channel
//! and wiring it up. [`EventEmitter::on_many`] replays several tags as one
//! stream, keeping the order in which they were emitted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// The channel task started; emitted once, before any connection attempt.
pub const START: &str = "start";
/// The first successful connection.
pub const CONNECT: &str = "connect";
/// A successful connection after a [`DISCONNECT`].
pub const RECONNECT: &str = "reconnect";
/// The connection was lost or could not be made; the transport keeps retrying.
pub const DISCONNECT: &str = "disconnect";
/// The channel is finished and will emit nothing more.
pub const STOP: &str = "stop";

/// A single event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub tag: String,
    pub payload: Value,
}

impl ChannelEvent {
    pub fn new(tag: impl Into<String>, payload: Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }

    /// A lifecycle event carries no payload.
    pub fn lifecycle(tag: &str) -> Self {
        Self::new(tag, Value::Null)
    }
}

pub type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Identifies one subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    /// Events for tags nobody listens to, in emission order across tags.
    pending: Vec<ChannelEvent>,
    /// Subscriptions still draining their backlog. Live events for them
    /// queue up here so they arrive after the replayed ones.
    replaying: HashMap<ListenerId, VecDeque<ChannelEvent>>,
}

/// Listener registry with buffering for not-yet-subscribed tags.
///
/// Listeners run on the emitting thread, outside the registry lock, so a
/// listener may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct EventEmitter {
    registry: Mutex<Registry>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe `listener` to `tag`.
    ///
    /// If events for `tag` were buffered they are delivered to this
    /// listener, in emission order, before `on` returns.
    pub fn on(&self, tag: &str, listener: Listener) -> ListenerId {
        self.on_many(&[tag], listener)
    }

    /// Subscribe `listener` to every tag in `tags` under one id.
    ///
    /// Buffered events for any of the tags are replayed in the order they
    /// were emitted, across tags. Events emitted while the replay runs are
    /// delivered after it, so the listener sees one ordered stream.
    pub fn on_many(&self, tags: &[&str], listener: Listener) -> ListenerId {
        let id = {
            let mut registry = self.registry();
            registry.next_id += 1;
            let id = ListenerId(registry.next_id);
            for tag in tags {
                registry
                    .listeners
                    .entry((*tag).to_owned())
                    .or_default()
                    .push((id, Arc::clone(&listener)));
            }

            let (backlog, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut registry.pending)
                .into_iter()
                .partition(|e| tags.iter().any(|tag| *tag == e.tag));
            registry.pending = rest;
            if !backlog.is_empty() {
                registry.replaying.insert(id, backlog.into());
            }
            id
        };

        loop {
            let next = {
                let mut registry = self.registry();
                match registry.replaying.get_mut(&id).and_then(VecDeque::pop_front) {
                    Some(event) => event,
                    None => {
                        registry.replaying.remove(&id);
                        break;
                    }
                }
            };
            listener(&next);
        }
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn off(&self, tag: &str, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let Some(listeners) = registry.listeners.get_mut(tag) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            registry.listeners.remove(tag);
        }
        removed
    }

    /// Deliver `event` to every listener of its tag, or buffer it.
    pub fn emit(&self, event: ChannelEvent) {
        let live: Vec<Listener> = {
            let mut registry = self.registry();
            let Some(subscribed) = registry.listeners.get(&event.tag).cloned() else {
                tracing::trace!(tag = %event.tag, "No listener yet, buffering event");
                registry.pending.push(event);
                return;
            };

            let mut live = Vec::with_capacity(subscribed.len());
            for (id, listener) in subscribed {
                match registry.replaying.get_mut(&id) {
                    Some(queue) => queue.push_back(event.clone()),
                    None => live.push(listener),
                }
            }
            live
        };

        for listener in live {
            listener(&event);
        }
    }

    /// Number of listeners currently subscribed to `tag`.
    pub fn listener_count(&self, tag: &str) -> usize {
        self.registry().listeners.get(tag).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Listener, Arc<Mutex<Vec<ChannelEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Listener = Arc::new(move |e: &ChannelEvent| sink.lock().unwrap().push(e.clone()));
        (listener, seen)
    }

    #[test]
    fn every_listener_of_a_tag_is_called() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            emitter.on(DISCONNECT, Arc::new(move |_: &ChannelEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        emitter.emit(ChannelEvent::lifecycle(DISCONNECT));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn events_before_subscription_are_replayed_in_order() {
        let emitter = EventEmitter::new();
        emitter.emit(ChannelEvent::new("room", serde_json::json!(1)));
        emitter.emit(ChannelEvent::new("room", serde_json::json!(2)));

        let (listener, seen) = recorder();
        emitter.on("room", listener);

        let payloads: Vec<_> = seen.lock().unwrap().iter().map(|e| e.payload.clone()).collect();
        assert_eq!(payloads, vec![serde_json::json!(1), serde_json::json!(2)]);

        // The backlog is handed out once.
        let (late, late_seen) = recorder();
        emitter.on("room", late);
        assert!(late_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn off_stops_delivery() {
        let emitter = EventEmitter::new();
        let (listener, seen) = recorder();
        let id = emitter.on(START, listener);

        assert!(emitter.off(START, id));
        assert!(!emitter.off(START, id));
        assert_eq!(emitter.listener_count(START), 0);

        emitter.emit(ChannelEvent::lifecycle(START));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let emitter = Arc::new(EventEmitter::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let (emitter_c, slot_c) = (Arc::clone(&emitter), Arc::clone(&slot));
        let id = emitter.on(STOP, Arc::new(move |_: &ChannelEvent| {
            if let Some(id) = slot_c.lock().unwrap().take() {
                emitter_c.off(STOP, id);
            }
        }));
        *slot.lock().unwrap() = Some(id);

        emitter.emit(ChannelEvent::lifecycle(STOP));
        assert_eq!(emitter.listener_count(STOP), 0);
    }

    #[test]
    fn replay_across_tags_keeps_emission_order() {
        let emitter = EventEmitter::new();
        emitter.emit(ChannelEvent::lifecycle(CONNECT));
        emitter.emit(ChannelEvent::new("room", serde_json::json!(7)));
        emitter.emit(ChannelEvent::lifecycle(DISCONNECT));

        let (listener, seen) = recorder();
        emitter.on_many(&[DISCONNECT, RECONNECT, CONNECT], listener);

        let tags: Vec<_> = seen.lock().unwrap().iter().map(|e| e.tag.clone()).collect();
        assert_eq!(tags, vec![CONNECT, DISCONNECT]);

        // Tags outside the subscription stay buffered.
        let (rooms, rooms_seen) = recorder();
        emitter.on("room", rooms);
        assert_eq!(rooms_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_emitted_during_replay_follow_the_backlog() {
        let emitter = Arc::new(EventEmitter::new());
        emitter.emit(ChannelEvent::lifecycle(CONNECT));
        emitter.emit(ChannelEvent::lifecycle(DISCONNECT));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sink, source) = (Arc::clone(&seen), Arc::clone(&emitter));
        emitter.on_many(
            &[CONNECT, DISCONNECT, RECONNECT],
            Arc::new(move |e: &ChannelEvent| {
                let first = {
                    let mut seen = sink.lock().unwrap();
                    seen.push(e.tag.clone());
                    seen.len() == 1
                };
                if first {
                    source.emit(ChannelEvent::lifecycle(RECONNECT));
                }
            }),
        );

        assert_eq!(*seen.lock().unwrap(), vec![CONNECT, DISCONNECT, RECONNECT]);

        emitter.emit(ChannelEvent::lifecycle(DISCONNECT));
        assert_eq!(seen.lock().unwrap().len(), 4);
    }
}
