//! Recording runner for lifecycle and supervisor tests.
//!
//! Every runner built by one `RecordingFactory` reports into a shared
//! `Probe`, which tracks how many worker sets are active at once and which
//! class sets were started, in order.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{Runner, RunnerError, RunnerFactory};
use crate::resolve::WorkerClassRef;

#[derive(Debug, Default)]
pub struct ProbeState {
    pub active: usize,
    pub max_active: usize,
    /// Class names of every successfully started set
    pub started: Vec<Vec<String>>,
    pub stopped: usize,
    pub failed_starts: usize,
}

#[derive(Debug, Default)]
pub struct Probe {
    state: Mutex<ProbeState>,
}

impl Probe {
    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    pub fn max_active(&self) -> usize {
        self.state.lock().max_active
    }

    pub fn started(&self) -> Vec<Vec<String>> {
        self.state.lock().started.clone()
    }

    pub fn stopped(&self) -> usize {
        self.state.lock().stopped
    }

    pub fn failed_starts(&self) -> usize {
        self.state.lock().failed_starts
    }
}

/// Knobs applied to runners created after they are set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    pub fail_start: bool,
    /// A failing start leaves one set active until it drains
    pub partial_start: bool,
    /// Time between `request_stop` and the drain completing
    pub drain_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub probe: Arc<Probe>,
    behavior: Arc<Mutex<Behavior>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.behavior.lock().fail_start = fail;
    }

    pub fn set_partial_start(&self, partial: bool) {
        self.behavior.lock().partial_start = partial;
    }

    pub fn set_drain_delay(&self, delay: Option<Duration>) {
        self.behavior.lock().drain_delay = delay;
    }
}

impl RunnerFactory for RecordingFactory {
    fn create(&self) -> Box<dyn Runner> {
        Box::new(RecordingRunner {
            probe: Arc::clone(&self.probe),
            behavior: *self.behavior.lock(),
            classes: Vec::new(),
            running: false,
            stop_requested_at: None,
        })
    }
}

pub struct RecordingRunner {
    probe: Arc<Probe>,
    behavior: Behavior,
    classes: Vec<String>,
    running: bool,
    stop_requested_at: Option<Instant>,
}

impl Runner for RecordingRunner {
    fn add_worker(&mut self, class: &WorkerClassRef) {
        self.classes.push(class.name().to_string());
    }

    fn start(&mut self) -> Result<(), RunnerError> {
        if self.behavior.fail_start {
            let mut state = self.probe.state.lock();
            state.failed_starts += 1;
            if self.behavior.partial_start {
                state.active += 1;
                state.max_active = state.max_active.max(state.active);
                self.running = true;
            }
            return Err(RunnerError::Refused {
                worker: self.classes.first().cloned().unwrap_or_default(),
                reason: "refused by test".into(),
            });
        }
        if self.classes.is_empty() {
            return Err(RunnerError::NoWorkers);
        }

        let mut state = self.probe.state.lock();
        state.active += 1;
        state.max_active = state.max_active.max(state.active);
        state.started.push(self.classes.clone());
        self.running = true;
        Ok(())
    }

    fn request_stop(&mut self) {
        self.stop_requested_at.get_or_insert_with(Instant::now);
    }

    fn wait(&mut self, timeout: Option<Duration>) -> bool {
        if !self.running {
            return true;
        }

        if let Some(delay) = self.behavior.drain_delay {
            let elapsed = self
                .stop_requested_at
                .map(|at| at.elapsed())
                .unwrap_or_default();
            let remaining = delay.saturating_sub(elapsed);
            match timeout {
                Some(timeout) if timeout < remaining => {
                    thread::sleep(timeout);
                    return false;
                }
                _ => thread::sleep(remaining),
            }
        }

        let mut state = self.probe.state.lock();
        state.active -= 1;
        state.stopped += 1;
        self.running = false;
        true
    }
}
