//! Aggregate connectivity across the channels of one session.
//!
//! [`ConnectivityTracker`] holds the set of channel kinds whose last
//! lifecycle event was a disconnect. The aggregate is
//! [`AggregateState::Connected`] while the set is empty and
//! [`AggregateState::Degraded`] otherwise. Only crossings of that
//! boundary produce a [`Transition`]; everything else is a no-op.

use std::collections::BTreeSet;

use wsmux_core::ChannelKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateState {
    /// No channel is down.
    Connected,
    /// At least one channel is down.
    Degraded,
}

/// An edge of the aggregate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Connected → Degraded.
    Lost,
    /// Degraded → Connected.
    Restored,
}

#[derive(Debug, Default)]
pub struct ConnectivityTracker {
    disconnected: BTreeSet<ChannelKind>,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel reported a disconnect.
    ///
    /// Returns [`Transition::Lost`] only when it is the first channel down.
    pub fn record_disconnect(&mut self, kind: ChannelKind) -> Option<Transition> {
        let was_connected = self.disconnected.is_empty();
        self.disconnected.insert(kind);
        was_connected.then_some(Transition::Lost)
    }

    /// A channel reported it is up again.
    ///
    /// Returns [`Transition::Restored`] only when this empties a non-empty
    /// set; a kind that was never down changes nothing.
    pub fn record_reconnect(&mut self, kind: ChannelKind) -> Option<Transition> {
        let removed = self.disconnected.remove(&kind);
        (removed && self.disconnected.is_empty()).then_some(Transition::Restored)
    }

    pub fn state(&self) -> AggregateState {
        if self.disconnected.is_empty() {
            AggregateState::Connected
        } else {
            AggregateState::Degraded
        }
    }

    pub fn is_disconnected(&self, kind: ChannelKind) -> bool {
        self.disconnected.contains(&kind)
    }

    /// Kinds currently down, in [`ChannelKind`] order.
    pub fn disconnected(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.disconnected.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChannelKind::{List, Main, Observe, User};

    #[test]
    fn starts_connected() {
        let tracker = ConnectivityTracker::new();
        assert_eq!(tracker.state(), AggregateState::Connected);
        assert_eq!(tracker.disconnected().count(), 0);
    }

    #[test]
    fn only_first_disconnect_is_an_edge() {
        let mut tracker = ConnectivityTracker::new();
        assert_eq!(tracker.record_disconnect(Main), Some(Transition::Lost));
        assert_eq!(tracker.record_disconnect(Observe), None);
        assert_eq!(tracker.record_disconnect(Main), None);
        assert_eq!(tracker.state(), AggregateState::Degraded);
        assert_eq!(tracker.disconnected().collect::<Vec<_>>(), vec![Main, Observe]);
    }

    #[test]
    fn only_last_reconnect_is_an_edge() {
        let mut tracker = ConnectivityTracker::new();
        tracker.record_disconnect(Main);
        tracker.record_disconnect(Observe);

        assert_eq!(tracker.record_reconnect(Main), None);
        assert!(!tracker.is_disconnected(Main));
        assert_eq!(tracker.state(), AggregateState::Degraded);

        assert_eq!(tracker.record_reconnect(Observe), Some(Transition::Restored));
        assert_eq!(tracker.state(), AggregateState::Connected);
    }

    #[test]
    fn reconnect_of_healthy_channel_is_ignored() {
        let mut tracker = ConnectivityTracker::new();
        assert_eq!(tracker.record_reconnect(List), None);

        tracker.record_disconnect(User);
        assert_eq!(tracker.record_reconnect(List), None);
        assert_eq!(tracker.state(), AggregateState::Degraded);
    }

    /// Drive a fixed pseudo-random event sequence and compare against a
    /// straightforward count of boundary crossings.
    #[test]
    fn edges_match_boundary_crossings() {
        let mut tracker = ConnectivityTracker::new();
        let mut model: BTreeSet<ChannelKind> = BTreeSet::new();
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let kind = ChannelKind::ALL[(seed % 4) as usize];
            let disconnect = (seed >> 8) % 2 == 0;

            let before = model.is_empty();
            let edge = if disconnect {
                model.insert(kind);
                tracker.record_disconnect(kind)
            } else {
                model.remove(&kind);
                tracker.record_reconnect(kind)
            };
            let after = model.is_empty();

            let expected = match (before, after) {
                (true, false) => Some(Transition::Lost),
                (false, true) => Some(Transition::Restored),
                _ => None,
            };
            assert_eq!(edge, expected);
            assert_eq!(tracker.disconnected().collect::<BTreeSet<_>>(), model);
        }
    }
}
