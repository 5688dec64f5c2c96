mod clock;
mod ticker;

pub use clock::{Clock, ManualClock, RuntimeClock};
pub use ticker::{IntervalScheduler, ManualScheduler, Scheduler, Ticks};

use crate::model::{Measurement, RunPhase, Sample};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { started_at: Instant },
}

/// Start/stop state machine for a single free-fall run.
///
/// The timer does not schedule anything itself: whoever drives it calls
/// [`RunTimer::sample`] on each tick while the run is active.
pub struct RunTimer<C> {
    clock: C,
    state: RunState,
    readout: Option<Sample>,
    // Last sample taken during the current run, as opposed to the frozen readout.
    run_sample: Option<Sample>,
}

impl<C: Clock> RunTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: RunState::Idle,
            readout: None,
            run_sample: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn phase(&self) -> RunPhase {
        match self.state {
            RunState::Idle => RunPhase::Idle,
            RunState::Running { .. } => RunPhase::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    /// Current readout; `None` until the first sample of a run.
    /// Stays frozen after `stop()` until the next `start()`.
    pub fn readout(&self) -> Option<Sample> {
        self.readout
    }

    /// Begin a run. Returns false (and does nothing) if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let started_at = self.clock.now();
        self.state = RunState::Running { started_at };
        self.readout = None;
        self.run_sample = None;
        debug!("run started");
        true
    }

    /// Take one sample of the active run.
    pub fn sample(&mut self) -> Option<Sample> {
        let RunState::Running { started_at } = self.state else {
            return None;
        };
        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(started_at)
            .as_secs_f64();
        let sample = Sample::at(elapsed);
        self.readout = Some(sample);
        self.run_sample = Some(sample);
        Some(sample)
    }

    /// End the run and hand back the measurement to record.
    ///
    /// Returns `None` when idle, or when no sample was taken during the run.
    pub fn stop(&mut self) -> Option<Measurement> {
        if !self.is_running() {
            return None;
        }
        self.state = RunState::Idle;
        let measurement = self.run_sample.take().map(Measurement::from_sample);
        debug!(recorded = measurement.is_some(), "run stopped");
        measurement
    }
}
