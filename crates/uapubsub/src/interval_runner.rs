// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic action scheduler.
//!
//! Each runner owns one tokio task. Every cycle it sleeps until the next
//! scheduled time (at least [`MIN_INTERVAL`]), reschedules, and, when the
//! `can_execute` predicate allows it, fires the action on the blocking pool
//! without waiting for it. A slow action therefore never delays the schedule.
//! Stopping prevents further cycles; an action already running completes.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Shortest interval and shortest sleep of a cycle.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

pub type CanExecuteFn = Arc<dyn Fn() -> bool + Send + Sync>;
pub type IntervalAction = Arc<dyn Fn() + Send + Sync>;

/// Runs an action periodically on a background task.
pub struct IntervalRunner {
    id: String,
    interval: Arc<Mutex<Duration>>,
    can_execute: Option<CanExecuteFn>,
    action: Option<IntervalAction>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalRunner {
    /// The action only fires when both `can_execute` and `action` are set.
    pub fn new(
        id: impl Into<String>,
        interval: Duration,
        can_execute: Option<CanExecuteFn>,
        action: Option<IntervalAction>,
    ) -> Self {
        Self {
            id: id.into(),
            interval: Arc::new(Mutex::new(interval.max(MIN_INTERVAL))),
            can_execute,
            action,
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    /// Takes effect from the next cycle; clamped to [`MIN_INTERVAL`].
    pub fn set_interval(&self, interval: Duration) {
        *self.interval.lock() = interval.max(MIN_INTERVAL);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the scheduling task on `handle`. No-op when already running.
    pub fn start(&self, handle: &Handle) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("IntervalRunner {} started, interval {:?}", self.id, self.interval());

        let id = self.id.clone();
        let interval = self.interval.clone();
        let can_execute = self.can_execute.clone();
        let action = self.action.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();

        let task = handle.spawn(async move {
            let mut next_publish = Instant::now() + *interval.lock();
            loop {
                let period = *interval.lock();
                let until_next = next_publish.saturating_duration_since(Instant::now());
                let sleep = period.min(until_next).max(MIN_INTERVAL);

                tokio::select! {
                    _ = tokio::time::sleep(sleep) => {}
                    _ = shutdown.notified() => break,
                }
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                next_publish = Instant::now() + period;

                if let (Some(can_execute), Some(action)) = (&can_execute, &action) {
                    if can_execute() {
                        let action = action.clone();
                        tokio::task::spawn_blocking(move || action());
                    } else {
                        trace!("IntervalRunner {} skipped a cycle", id);
                    }
                }
            }
            debug!("IntervalRunner {} stopped", id);
        });
        *self.task.lock() = Some(task);
    }

    /// Stop scheduling further cycles.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for IntervalRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_action(counter: &Arc<AtomicUsize>) -> IntervalAction {
        let counter = counter.clone();
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_interval_is_clamped() {
        let runner = IntervalRunner::new("r", Duration::from_millis(1), None, None);
        assert_eq!(runner.interval(), MIN_INTERVAL);
        runner.set_interval(Duration::ZERO);
        assert_eq!(runner.interval(), MIN_INTERVAL);
        runner.set_interval(Duration::from_millis(250));
        assert_eq!(runner.interval(), Duration::from_millis(250));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_action_runs_periodically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let runner = IntervalRunner::new(
            "periodic",
            Duration::from_millis(20),
            Some(Arc::new(|| true)),
            Some(counter_action(&counter)),
        );
        runner.start(&Handle::current());
        tokio::time::sleep(Duration::from_millis(200)).await;
        runner.stop();

        let fired = counter.load(Ordering::SeqCst);
        assert!(fired >= 3, "only {} cycles fired", fired);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), fired);
        assert!(!runner.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_can_execute_gates_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let checks = Arc::new(AtomicUsize::new(0));
        let checks_in = checks.clone();
        let runner = IntervalRunner::new(
            "gated",
            Duration::from_millis(10),
            Some(Arc::new(move || {
                checks_in.fetch_add(1, Ordering::SeqCst);
                false
            })),
            Some(counter_action(&counter)),
        );
        runner.start(&Handle::current());
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(runner);

        assert!(checks.load(Ordering::SeqCst) > 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_action_does_not_delay_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_in = counter.clone();
        let runner = IntervalRunner::new(
            "slow",
            Duration::from_millis(20),
            Some(Arc::new(|| true)),
            Some(Arc::new(move || {
                counter_in.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(150));
            })),
        );
        runner.start(&Handle::current());
        tokio::time::sleep(Duration::from_millis(120)).await;
        runner.stop();

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }
}
