//! Worker runner seam.
//!
//! The supervisor never looks inside a runner. It builds one per worker set
//! through a `RunnerFactory`, registers classes, starts it, and later asks it
//! to stop and waits for the drain. `ThreadRunner` is the in-process
//! implementation used by the binary.

mod backdoor;
mod thread;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use thiserror::Error;

use crate::config::SupervisorConfig;
use crate::resolve::WorkerClassRef;

pub use thread::ThreadRunner;

/// Failures raised by a runner implementation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no worker classes registered")]
    NoWorkers,

    #[error("worker `{worker}` refused to start: {reason}")]
    Refused { worker: String, reason: String },

    #[error("failed to spawn worker thread `{0}`")]
    Spawn(String, #[source] std::io::Error),

    #[error("failed to bind backdoor on port {port}: {reason}")]
    Backdoor { port: u16, reason: String },
}

/// Hosts one worker set.
pub trait Runner: Send {
    /// Register a worker class. Only called before `start`.
    fn add_worker(&mut self, class: &WorkerClassRef);

    /// Begin executing every registered class.
    fn start(&mut self) -> Result<(), RunnerError>;

    /// Ask workers to finish their current unit of work and exit.
    /// Must not block; safe to call more than once.
    fn request_stop(&mut self);

    /// Block until every worker has exited or `timeout` elapses.
    ///
    /// Returns `true` once the drain is confirmed. `None` waits forever.
    fn wait(&mut self, timeout: Option<Duration>) -> bool;
}

/// Builds a fresh runner for each worker set.
pub trait RunnerFactory {
    fn create(&self) -> Box<dyn Runner>;
}

/// Factory for `ThreadRunner`, carrying the broker and backdoor settings.
pub struct ThreadRunnerFactory {
    broker_uri: String,
    backdoor_port: Option<u16>,
}

impl ThreadRunnerFactory {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            broker_uri: config.broker_uri.clone(),
            backdoor_port: config.backdoor_port,
        }
    }
}

impl RunnerFactory for ThreadRunnerFactory {
    fn create(&self) -> Box<dyn Runner> {
        Box::new(ThreadRunner::new(&self.broker_uri, self.backdoor_port))
    }
}
