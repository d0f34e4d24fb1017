//! Scheduler collaborator.
//!
//! The runtime never spins its own timers; it hands repeating tasks to a
//! `Scheduler` and keeps only the cancellable handle. The production
//! implementation rides on tokio intervals, the manual one is driven by
//! explicit `tick()` calls from a host loop (and from tests).

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A repeating task. Receives its own handle so it can self-cancel.
pub type RepeatingTask = Box<dyn FnMut(&TaskHandle) + Send>;

pub trait Scheduler: Send + Sync {
    /// Arms a repeating task: first run after `initial_delay`, then every
    /// `period` until the returned handle is cancelled.
    fn schedule_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: RepeatingTask,
    ) -> TaskHandle;
}

/// Cancellable handle for a scheduled task. Cancellation is cooperative
/// and idempotent; the task stops at its next wakeup.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Scheduler backed by `tokio::time::interval`. Requires a running tokio
/// runtime when tasks are armed.
#[derive(Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        mut task: RepeatingTask,
    ) -> TaskHandle {
        let handle = TaskHandle::new();
        let task_handle = handle.clone();

        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            // interval_at, not interval: a plain interval's first tick
            // completes immediately, which would run the task twice
            // back-to-back after the initial delay.
            let period = period.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                if task_handle.is_cancelled() {
                    return;
                }
                task(&task_handle);
                if task_handle.is_cancelled() {
                    return;
                }
                interval.tick().await;
            }
        });

        handle
    }
}

struct ManualEntry {
    handle: TaskHandle,
    task: RepeatingTask,
}

/// Deterministic scheduler: `tick()` runs every live task exactly once, in
/// arming order. Delay and period are ignored; the host loop owns cadence.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<Vec<ManualEntry>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs each non-cancelled task once and drops the cancelled ones.
    /// The lock is released while tasks run, so a task may arm new ones;
    /// those first run on the next tick.
    pub fn tick(&self) {
        let mut current = std::mem::take(&mut *self.tasks.lock());
        for entry in current.iter_mut() {
            if !entry.handle.is_cancelled() {
                (entry.task)(&entry.handle);
            }
        }

        let mut tasks = self.tasks.lock();
        current.retain(|e| !e.handle.is_cancelled());
        current.append(&mut *tasks);
        *tasks = current;
    }

    pub fn live_tasks(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(
        &self,
        _initial_delay: Duration,
        _period: Duration,
        task: RepeatingTask,
    ) -> TaskHandle {
        let handle = TaskHandle::new();
        self.tasks.lock().push(ManualEntry {
            handle: handle.clone(),
            task,
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_tick_runs_until_cancelled() {
        let sched = ManualScheduler::new();
        let seen = Arc::new(Mutex::new(0u32));

        let seen2 = seen.clone();
        let handle = sched.schedule_repeating(
            Duration::ZERO,
            Duration::from_millis(10),
            Box::new(move |_| *seen2.lock() += 1),
        );

        sched.tick();
        sched.tick();
        assert_eq!(*seen.lock(), 2);

        handle.cancel();
        sched.tick();
        assert_eq!(*seen.lock(), 2);
        assert_eq!(sched.live_tasks(), 0);
    }

    #[test]
    fn task_can_self_cancel() {
        let sched = ManualScheduler::new();
        let seen = Arc::new(Mutex::new(0u32));

        let seen2 = seen.clone();
        sched.schedule_repeating(
            Duration::ZERO,
            Duration::from_millis(10),
            Box::new(move |handle| {
                *seen2.lock() += 1;
                handle.cancel();
            }),
        );

        sched.tick();
        sched.tick();
        assert_eq!(*seen.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_task_waits_a_full_period_between_runs() {
        let sched = TokioScheduler;
        let seen = Arc::new(Mutex::new(0u32));

        let seen2 = seen.clone();
        let handle = sched.schedule_repeating(
            Duration::from_millis(5),
            Duration::from_secs(60),
            Box::new(move |_| *seen2.lock() += 1),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*seen.lock(), 1);

        // no second run until a full period has elapsed
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(*seen.lock(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(*seen.lock(), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(*seen.lock(), 2);
    }

    #[test]
    fn cancel_is_idempotent() {
        let handle = TaskHandle::new();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
