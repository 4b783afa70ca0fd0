//! Worker set lifecycle.
//!
//! ```text
//! Idle ──start──▶ Starting ──ok──▶ Running ──stop──▶ Stopping ──drained──▶ Idle
//!                    │                                   │
//!                    ├──runner failed (drained)──▶ Idle  └──timeout: stays Stopping
//!                    └──runner failed (drain timed out)──▶ Stopping
//! ```
//!
//! At most one runner exists at a time. A new set can only be started from
//! `Idle`, and `Idle` is only reached once the previous runner confirmed its
//! drain, so two worker sets never overlap.


use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::resolve::{WorkerClassRef, class_names};
use crate::runner::{Runner, RunnerError, RunnerFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a worker set is already {0}")]
    AlreadyActive(LifecycleState),

    #[error("worker set failed to start")]
    StartFailed(#[source] RunnerError),

    #[error("worker set did not drain within {0:?}")]
    StopTimeout(Duration),
}

/// Owns the active runner and enforces the state machine.
pub struct WorkerSetLifecycle<F: RunnerFactory> {
    factory: F,
    stop_timeout: Option<Duration>,
    state: LifecycleState,
    runner: Option<Box<dyn Runner>>,
    classes: Vec<WorkerClassRef>,
}

impl<F: RunnerFactory> WorkerSetLifecycle<F> {
    /// `stop_timeout = None` makes `stop` wait for the drain indefinitely.
    pub fn new(factory: F, stop_timeout: Option<Duration>) -> Self {
        Self {
            factory,
            stop_timeout,
            state: LifecycleState::Idle,
            runner: None,
            classes: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Classes of the current (or stopping) set. Empty when idle.
    pub fn classes(&self) -> &[WorkerClassRef] {
        &self.classes
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Build a runner for `classes` and start it.
    ///
    /// When the runner fails to start, whatever it brought up is drained
    /// within the stop timeout. If that drain times out the lifecycle is left
    /// in `Stopping`, exactly as after a timed-out `stop`.
    pub fn start(&mut self, classes: &[WorkerClassRef]) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Idle {
            return Err(LifecycleError::AlreadyActive(self.state));
        }

        self.state = LifecycleState::Starting;
        let mut runner = self.factory.create();
        for class in classes {
            runner.add_worker(class);
        }

        if let Err(err) = runner.start() {
            // Some workers may already be up
            runner.request_stop();
            if runner.wait(self.stop_timeout) {
                self.state = LifecycleState::Idle;
            } else {
                // Keep the half-started runner so a later `stop` finishes the drain
                self.runner = Some(runner);
                self.classes = classes.to_vec();
                self.state = LifecycleState::Stopping;
            }
            return Err(LifecycleError::StartFailed(err));
        }

        crate::debug!("run"; "worker set running: {}", class_names(classes));
        self.runner = Some(runner);
        self.classes = classes.to_vec();
        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Request a graceful stop and block until the runner has drained.
    ///
    /// No-op when idle. On `StopTimeout` the lifecycle stays `Stopping` and
    /// the next call keeps waiting on the same runner.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(runner) = self.runner.as_mut() else {
            self.state = LifecycleState::Idle;
            return Ok(());
        };

        if self.state != LifecycleState::Stopping {
            self.state = LifecycleState::Stopping;
            runner.request_stop();
        }

        if !runner.wait(self.stop_timeout) {
            let timeout = self.stop_timeout.unwrap_or_default();
            return Err(LifecycleError::StopTimeout(timeout));
        }

        self.runner = None;
        self.classes.clear();
        self.state = LifecycleState::Idle;
        Ok(())
    }
}
