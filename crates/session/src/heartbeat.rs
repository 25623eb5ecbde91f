//! Periodic presence updates on the main channel.
//!
//! The heartbeat lives exactly as long as its [`HeartbeatGuard`]: dropping
//! the guard (or cancelling the parent token) stops the task, and so does
//! the channel handle going away.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use wsmux_core::ChannelHandle;

use crate::activity::ActivityObserver;
use crate::error::SessionError;

/// Owns a running heartbeat task. Dropping it stops the task.
#[derive(Debug)]
pub struct HeartbeatGuard {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl HeartbeatGuard {
    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start sending `observer`'s state into `handle` every `period`.
///
/// The first update goes out one `period` after the call. `cancel`
/// should be a token owned by the caller (usually a child of the session
/// token); it is cancelled when the returned guard drops.
pub fn spawn_heartbeat(
    handle: &Arc<dyn ChannelHandle>,
    observer: Arc<dyn ActivityObserver>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<HeartbeatGuard, SessionError> {
    let kind = handle.kind();
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| SessionError::Init {
        kind,
        reason: format!("heartbeat needs a Tokio runtime: {e}"),
    })?;

    let weak = Arc::downgrade(handle);
    let task_cancel = cancel.clone();
    let task = runtime.spawn(async move {
        tracing::debug!(kind = %kind, period_ms = period.as_millis() as u64, "Heartbeat started");
        run_heartbeat(weak, observer, period, &task_cancel).await;
        tracing::debug!(kind = %kind, "Heartbeat stopped");
    });

    Ok(HeartbeatGuard { cancel, task })
}

async fn run_heartbeat(
    handle: Weak<dyn ChannelHandle>,
    observer: Arc<dyn ActivityObserver>,
    period: Duration,
    cancel: &CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let Some(handle) = handle.upgrade() else {
            return;
        };

        let activity = observer.current();
        tracing::trace!(kind = %handle.kind(), ?activity, "Heartbeat tick");
        if let Err(e) = handle.update(activity) {
            tracing::debug!(kind = %handle.kind(), error = %e, "Heartbeat update not sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use wsmux_core::protocol::MainToServer;
    use wsmux_core::{
        ActivityState, ChannelKind, ClientMessage, EventEmitter, Listener, ListenerId,
        TransportError,
    };

    use crate::activity::{FixedActivity, IdleTracker};

    #[derive(Default)]
    struct Recorder {
        events: EventEmitter,
        sent: Mutex<Vec<ClientMessage>>,
    }

    impl ChannelHandle for Recorder {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Main
        }
        fn on(&self, tag: &str, listener: Listener) -> ListenerId {
            self.events.on(tag, listener)
        }
        fn on_many(&self, tags: &[&str], listener: Listener) -> ListenerId {
            self.events.on_many(tags, listener)
        }
        fn off(&self, tag: &str, id: ListenerId) -> bool {
            self.events.off(tag, id)
        }
        fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn updates(recorder: &Recorder) -> Vec<ActivityState> {
        recorder
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                ClientMessage::Main(MainToServer::Update(state)) => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let recorder = Arc::new(Recorder::default());
        let handle: Arc<dyn ChannelHandle> = recorder.clone();
        let _guard = spawn_heartbeat(
            &handle,
            Arc::new(FixedActivity(ActivityState::Active)),
            Duration::from_secs(200),
            CancellationToken::new(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(199)).await;
        assert!(updates(&recorder).is_empty());

        tokio::time::sleep(Duration::from_secs(402)).await;
        assert_eq!(updates(&recorder), vec![ActivityState::Active; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_latest_sample_after_going_idle() {
        let recorder = Arc::new(Recorder::default());
        let handle: Arc<dyn ChannelHandle> = recorder.clone();
        let idle = Arc::new(IdleTracker::new(Duration::from_secs(300)));
        let _guard = spawn_heartbeat(
            &handle,
            idle.clone(),
            Duration::from_secs(200),
            CancellationToken::new(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(401)).await;
        assert_eq!(
            updates(&recorder),
            vec![ActivityState::Active, ActivityState::Idle]
        );

        idle.touch();
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(updates(&recorder).last(), Some(&ActivityState::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_guard_stops_updates() {
        let recorder = Arc::new(Recorder::default());
        let handle: Arc<dyn ChannelHandle> = recorder.clone();
        let guard = spawn_heartbeat(
            &handle,
            Arc::new(FixedActivity(ActivityState::Active)),
            Duration::from_secs(200),
            CancellationToken::new(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(201)).await;
        drop(guard);
        tokio::time::sleep(Duration::from_secs(1_000)).await;
        assert_eq!(updates(&recorder).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_handle_is_gone() {
        let recorder = Arc::new(Recorder::default());
        let handle: Arc<dyn ChannelHandle> = recorder;
        let guard = spawn_heartbeat(
            &handle,
            Arc::new(FixedActivity(ActivityState::Active)),
            Duration::from_secs(200),
            CancellationToken::new(),
        )
        .unwrap();

        drop(handle);
        tokio::time::sleep(Duration::from_secs(201)).await;
        assert!(guard.is_finished());
    }

    #[test]
    fn needs_a_runtime() {
        let handle: Arc<dyn ChannelHandle> = Arc::new(Recorder::default());
        let result = spawn_heartbeat(
            &handle,
            Arc::new(FixedActivity(ActivityState::Active)),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(SessionError::Init { kind: ChannelKind::Main, .. })));
    }
}
