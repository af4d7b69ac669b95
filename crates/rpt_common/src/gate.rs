//! Invocation Gate - at most one pipeline run in flight
//!
//! Triggers arriving while a run is active are dropped (default) or, with
//! `QueueOne`, remembered once and replayed right after the current run.
//! Runs execute on their own tokio task so the trigger listener never waits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What to do with a trigger that arrives during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    #[default]
    Drop,
    QueueOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Started,
    Queued,
    Dropped,
}

/// The work behind one trigger
#[async_trait]
pub trait TriggerHandler: Send + Sync + 'static {
    async fn on_trigger(&self);
}

#[derive(Debug, Clone, Copy, Default)]
struct GateState {
    running: bool,
    pending: bool,
}

/// Counters since the gate was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    pub completed: u64,
    pub dropped: u64,
}

struct GateInner {
    handler: Arc<dyn TriggerHandler>,
    policy: GatePolicy,
    state: watch::Sender<GateState>,
    completed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Clone)]
pub struct InvocationGate {
    inner: Arc<GateInner>,
}

impl InvocationGate {
    pub fn new(handler: Arc<dyn TriggerHandler>, policy: GatePolicy) -> Self {
        let (state, _) = watch::channel(GateState::default());
        Self {
            inner: Arc::new(GateInner {
                handler,
                policy,
                state,
                completed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.inner.policy
    }

    /// Offer one trigger to the gate. Must be called inside a tokio runtime.
    pub fn submit(&self) -> SubmitOutcome {
        let policy = self.inner.policy;
        let mut outcome = SubmitOutcome::Dropped;

        self.inner.state.send_if_modified(|state| {
            if !state.running {
                state.running = true;
                outcome = SubmitOutcome::Started;
                true
            } else if policy == GatePolicy::QueueOne && !state.pending {
                state.pending = true;
                outcome = SubmitOutcome::Queued;
                true
            } else {
                false
            }
        });

        match outcome {
            SubmitOutcome::Started => {
                debug!("[GATE] Run started");
                tokio::spawn(run_loop(self.inner.clone()));
            }
            SubmitOutcome::Queued => debug!("[GATE] Run active, trigger queued"),
            SubmitOutcome::Dropped => {
                self.inner.dropped.fetch_add(1, Ordering::SeqCst);
                info!("[GATE] Run active, trigger dropped");
            }
        }
        outcome
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.borrow().running
    }

    /// Resolve once no run is active (immediately if idle)
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|state| !state.running).await;
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            completed: self.inner.completed.load(Ordering::SeqCst),
            dropped: self.inner.dropped.load(Ordering::SeqCst),
        }
    }
}

async fn run_loop(inner: Arc<GateInner>) {
    let mut guard = RunGuard {
        inner: inner.clone(),
        armed: true,
    };

    loop {
        inner.handler.on_trigger().await;
        inner.completed.fetch_add(1, Ordering::SeqCst);

        let mut again = false;
        inner.state.send_if_modified(|state| {
            if state.pending {
                state.pending = false;
                again = true;
            } else {
                state.running = false;
            }
            true
        });

        if !again {
            break;
        }
        debug!("[GATE] Replaying queued trigger");
    }

    guard.armed = false;
}

/// Releases the gate if a run unwinds
struct RunGuard {
    inner: Arc<GateInner>,
    armed: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!("[GATE] Run aborted, releasing gate");
            self.inner.state.send_modify(|state| {
                state.running = false;
                state.pending = false;
            });
        }
    }
}
