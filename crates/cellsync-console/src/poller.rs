//! Fixed-cadence status/log polling.
//!
//! Every tick (timer or on-demand trigger) gets a sequence number and runs as
//! its own task, so a slow fetch never delays the next tick. At most
//! [`MAX_POLLS_IN_FLIGHT`] fetches wait on the backend at once. Responses can
//! land out of order; [`PollSequencer`] keeps only the newest one.

use cellsync_core::{ClientError, ControlPlane, StatusSnapshot};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info};

use crate::events::ConsoleEvent;

/// Ticks are skipped while this many fetches are still waiting on the backend.
pub const MAX_POLLS_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterState {
    pub status: StatusSnapshot,
    pub logs: Vec<String>,
}

/// Fetches status and logs together; either failure fails the whole poll.
pub async fn fetch_cluster(plane: &dyn ControlPlane) -> Result<ClusterState, ClientError> {
    let (status, logs) = tokio::try_join!(plane.fetch_status(), plane.fetch_logs())?;
    Ok(ClusterState { status, logs })
}

/// Asks the running poller for one extra tick.
#[derive(Clone, Debug)]
pub struct PollTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl PollTrigger {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn request(&self) {
        if self.tx.send(()).is_err() {
            debug!(event = "poll_trigger_dropped", reason = "poller_stopped");
        }
    }
}

/// Owns the polling task. Dropping it stops the timer; fetches already in
/// flight finish on their own and their results are dropped with the loop.
pub struct PollerHandle {
    trigger: PollTrigger,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn trigger(&self) -> PollTrigger {
        self.trigger.clone()
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
        info!(event = "poller_stopped");
    }
}

pub fn spawn(
    plane: Arc<dyn ControlPlane>,
    events: mpsc::Sender<ConsoleEvent>,
    interval: Duration,
) -> PollerHandle {
    let (trigger, mut requests) = PollTrigger::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let slots = Arc::new(Semaphore::new(MAX_POLLS_IN_FLIGHT));
        let mut seq = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(()) = requests.recv() => {}
            }
            let Ok(permit) = slots.clone().try_acquire_owned() else {
                debug!(event = "poll_skipped", reason = "fetches_pending", last_seq = seq);
                continue;
            };
            seq = seq.saturating_add(1);
            issue_poll(plane.clone(), events.clone(), seq, permit);
        }
    });
    info!(
        event = "poller_started",
        interval_ms = interval.as_millis() as u64
    );
    PollerHandle { trigger, task }
}

fn issue_poll(
    plane: Arc<dyn ControlPlane>,
    events: mpsc::Sender<ConsoleEvent>,
    seq: u64,
    permit: OwnedSemaphorePermit,
) {
    tokio::spawn(async move {
        let result = fetch_cluster(plane.as_ref()).await;
        drop(permit);
        if events
            .send(ConsoleEvent::Polled { seq, result })
            .await
            .is_err()
        {
            debug!(event = "poll_result_discarded", seq, reason = "loop_closed");
        }
    });
}

/// Tracks the highest applied poll sequence.
#[derive(Debug, Default)]
pub struct PollSequencer {
    last_applied: u64,
}

impl PollSequencer {
    /// Returns true when `seq` is newer than everything applied so far and
    /// records it as applied.
    pub fn admit(&mut self, seq: u64) -> bool {
        if seq <= self.last_applied {
            return false;
        }
        self.last_applied = seq;
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }
}
