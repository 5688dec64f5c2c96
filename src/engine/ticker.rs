//! Periodic sampling ticks.
//!
//! A [`Ticks`] handle owns one periodic callback. Dropping it cancels the
//! callback and discards any tick that was queued but not yet received.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Installs periodic ticks.
pub trait Scheduler {
    fn every(&self, period: Duration) -> Ticks;
}

/// Receiving side of one periodic tick source.
#[derive(Debug)]
pub struct Ticks {
    rx: mpsc::UnboundedReceiver<()>,
    task: Option<JoinHandle<()>>,
}

impl Ticks {
    /// Wait for the next tick. `None` once the source is gone.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

impl Drop for Ticks {
    fn drop(&mut self) {
        // Dropping a JoinHandle does not cancel the task, so abort explicitly.
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }
}

/// Ticks driven by a tokio interval task. Must be used inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    fn every(&self, period: Duration) -> Ticks {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            // First tick fires one period after start, not immediately.
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        Ticks {
            rx,
            task: Some(task),
        }
    }
}

/// Ticks fired by hand, for driving the controller without real time passing.
/// Clones share the currently armed tick source.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    armed: Arc<Mutex<Option<mpsc::UnboundedSender<()>>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one tick to the armed source. Returns false if nothing is armed.
    pub fn fire(&self) -> bool {
        let armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        match armed.as_ref() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// True while a [`Ticks`] handle from this scheduler is still alive.
    pub fn is_armed(&self) -> bool {
        let armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        armed.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, _period: Duration) -> Ticks {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        Ticks { rx, task: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_ticks_stop_after_drop() {
        let scheduler = ManualScheduler::new();
        assert!(!scheduler.fire());

        let mut ticks = scheduler.every(Duration::from_millis(100));
        assert!(scheduler.is_armed());
        assert!(scheduler.fire());
        assert_eq!(ticks.next().await, Some(()));

        drop(ticks);
        assert!(!scheduler.is_armed());
        assert!(!scheduler.fire());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_once_per_period() {
        let mut ticks = IntervalScheduler.every(Duration::from_millis(100));
        let start = tokio::time::Instant::now();
        ticks.next().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        ticks.next().await;
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }
}
