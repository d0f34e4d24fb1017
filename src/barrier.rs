//! Deferred-initialization barrier.
//!
//! A module that wants to reference another module's registry before that
//! module is guaranteed loaded parks the work here. The barrier polls a
//! readiness predicate on the scheduler's cadence; on the first poll where
//! it holds, the queued actions run exactly once in enqueue order and the
//! poll cancels itself. Anything enqueued after that runs immediately.

use crate::error::{CoreResult, RuntimeError};
use crate::sched::{Scheduler, TaskHandle};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// A queued zero-argument operation, consumed exactly once.
pub type DeferredAction = Box<dyn FnOnce() -> CoreResult<()> + Send>;

/// Readiness check, evaluated on every poll.
pub type ReadyPredicate = Box<dyn Fn() -> bool + Send>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BarrierState {
    Idle,
    Armed,
    Fired,
    Cancelled,
}

struct Inner {
    state: BarrierState,
    queue: VecDeque<DeferredAction>,
    failures: Vec<RuntimeError>,
    handle: Option<TaskHandle>,
    polls: u64,
}

/// Fire-at-most-once readiness gate with a FIFO action queue.
///
/// Clones share state; the container keeps one clone per armed barrier so
/// `shutdown` can cancel them all.
#[derive(Clone)]
pub struct DeferredBarrier {
    inner: Arc<Mutex<Inner>>,
}

impl Default for DeferredBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredBarrier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: BarrierState::Idle,
                queue: VecDeque::new(),
                failures: Vec::new(),
                handle: None,
                polls: 0,
            })),
        }
    }

    /// Arms the repeating poll. `stall_warn_polls` controls how often a
    /// still-false predicate is logged; the poll itself never times out
    /// (see DESIGN.md), it repeats until it fires or is cancelled.
    pub fn arm(
        &self,
        scheduler: &dyn Scheduler,
        predicate: ReadyPredicate,
        period: Duration,
        stall_warn_polls: u64,
    ) {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                BarrierState::Idle => inner.state = BarrierState::Armed,
                BarrierState::Cancelled => {
                    tracing::warn!("arming a cancelled barrier, ignoring");
                    return;
                }
                BarrierState::Armed | BarrierState::Fired => {
                    tracing::warn!("barrier armed twice, ignoring");
                    return;
                }
            }
        }

        let barrier = self.clone();
        let handle = scheduler.schedule_repeating(
            Duration::ZERO,
            period,
            Box::new(move |task| barrier.poll(&predicate, task, stall_warn_polls)),
        );

        let mut inner = self.inner.lock();
        match inner.state {
            // cancel() raced the arming; kill the fresh poll too
            BarrierState::Cancelled => handle.cancel(),
            _ => inner.handle = Some(handle),
        }
    }

    /// Appends `action`; if the barrier already fired, runs it right away
    /// so late registrants never wait on a poll that will not come.
    pub fn enqueue(&self, action: DeferredAction) {
        let run_now = {
            let mut inner = self.inner.lock();
            match inner.state {
                BarrierState::Fired => true,
                _ => {
                    inner.queue.push_back(action);
                    return;
                }
            }
        };

        if run_now && let Err(e) = action() {
            tracing::warn!(error = %e, "deferred action failed after barrier fired");
            self.inner.lock().failures.push(e);
        }
    }

    /// Idempotent: safe after firing, and repeatable. Must run before a
    /// module reload arms a fresh barrier so two live polls never drain
    /// overlapping queues.
    pub fn cancel(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.state != BarrierState::Fired {
                inner.state = BarrierState::Cancelled;
            }
            inner.handle.take()
        };

        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    pub fn has_fired(&self) -> bool {
        self.inner.lock().state == BarrierState::Fired
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().state == BarrierState::Cancelled
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Drains the failures recorded by actions that errored during a
    /// drain. Failures never abort the remaining queue.
    pub fn take_failures(&self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.inner.lock().failures)
    }

    fn poll(&self, predicate: &dyn Fn() -> bool, task: &TaskHandle, stall_warn_polls: u64) {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.state != BarrierState::Armed {
                task.cancel();
                return;
            }

            if !predicate() {
                inner.polls += 1;
                if stall_warn_polls > 0 && inner.polls % stall_warn_polls == 0 {
                    tracing::warn!(
                        polls = inner.polls,
                        pending = inner.queue.len(),
                        "barrier predicate still false"
                    );
                }
                return;
            }

            inner.state = BarrierState::Fired;
            std::mem::take(&mut inner.queue)
        };

        // Actions run outside the lock: they may touch registries or
        // re-enter this barrier via enqueue().
        let mut failures = Vec::new();
        for action in drained {
            if let Err(e) = action() {
                tracing::warn!(error = %e, "deferred action failed during drain");
                failures.push(e);
            }
        }

        let mut inner = self.inner.lock();
        inner.failures.extend(failures);
        inner.handle = None;
        task.cancel();
    }
}
