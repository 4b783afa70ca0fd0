//! In-process runner: one thread per worker execution context.
//!
//! Each context ticks at its class's interval, counting one unit of work
//! per tick, until the shared stop channel disconnects. A tick in progress
//! always completes before the thread exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use super::backdoor::Backdoor;
use super::{Runner, RunnerError};
use crate::resolve::WorkerClassRef;

/// Option key a worker can set to refuse startup (e.g. its broker is down).
pub const FAIL_START_OPTION: &str = "fail_start";

/// How often `wait` with a timeout checks for finished threads.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Processed-unit counter for one worker class, shared with the backdoor.
pub struct WorkerStats {
    pub name: String,
    pub queue: String,
    pub concurrency: usize,
    pub processed: AtomicU64,
}

pub struct ThreadRunner {
    broker_uri: String,
    backdoor_port: Option<u16>,
    classes: Vec<WorkerClassRef>,
    /// Dropped to signal stop (receivers see `Disconnected`)
    stop_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
    stats: Arc<Vec<WorkerStats>>,
    backdoor: Option<Backdoor>,
}

impl ThreadRunner {
    pub fn new(broker_uri: &str, backdoor_port: Option<u16>) -> Self {
        Self {
            broker_uri: broker_uri.to_string(),
            backdoor_port,
            classes: Vec::new(),
            stop_tx: None,
            handles: Vec::new(),
            stats: Arc::new(Vec::new()),
            backdoor: None,
        }
    }

    /// Units of work processed so far, per class in registration order.
    pub fn processed(&self) -> Vec<(String, u64)> {
        self.stats
            .iter()
            .map(|s| (s.name.clone(), s.processed.load(Ordering::Relaxed)))
            .collect()
    }

    fn check_startable(&self) -> Result<(), RunnerError> {
        if self.classes.is_empty() {
            return Err(RunnerError::NoWorkers);
        }

        for class in &self.classes {
            let refuses = class
                .definition
                .options
                .get(FAIL_START_OPTION)
                .and_then(toml::Value::as_bool)
                .unwrap_or(false);
            if refuses {
                return Err(RunnerError::Refused {
                    worker: class.name().to_string(),
                    reason: format!("cannot reach broker at {}", self.broker_uri),
                });
            }
        }
        Ok(())
    }
}

impl Runner for ThreadRunner {
    fn add_worker(&mut self, class: &WorkerClassRef) {
        self.classes.push(class.clone());
    }

    fn start(&mut self) -> Result<(), RunnerError> {
        self.check_startable()?;

        let stats: Arc<Vec<WorkerStats>> = Arc::new(
            self.classes
                .iter()
                .map(|class| WorkerStats {
                    name: class.name().to_string(),
                    queue: class.definition.queue.clone(),
                    concurrency: class.definition.concurrency,
                    processed: AtomicU64::new(0),
                })
                .collect(),
        );
        self.stats = Arc::clone(&stats);

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        self.stop_tx = Some(stop_tx);

        for (index, class) in self.classes.iter().enumerate() {
            for context in 0..class.definition.concurrency {
                let thread_name = format!("{}-{}", class.name(), context);
                let stop_rx = stop_rx.clone();
                let stats = Arc::clone(&stats);
                let interval = class.definition.interval;

                let handle = thread::Builder::new()
                    .name(thread_name.clone())
                    .spawn(move || work_loop(&stats[index], interval, &stop_rx))
                    .map_err(|err| RunnerError::Spawn(thread_name, err))?;
                self.handles.push(handle);
            }
        }

        if let Some(port) = self.backdoor_port {
            self.backdoor = Some(Backdoor::bind(port, stats)?);
        }

        crate::debug!(
            "runner";
            "{} thread(s) consuming from {}",
            self.handles.len(),
            self.broker_uri
        );
        Ok(())
    }

    fn request_stop(&mut self) {
        self.stop_tx.take();
        if let Some(backdoor) = &self.backdoor {
            backdoor.unblock();
        }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> bool {
        if let Some(timeout) = timeout {
            let deadline = Instant::now() + timeout;
            while !self.handles.iter().all(JoinHandle::is_finished) {
                if Instant::now() >= deadline {
                    return false;
                }
                thread::sleep(WAIT_POLL);
            }
        }

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                crate::log!("runner"; "a worker thread panicked during drain");
            }
        }
        if let Some(backdoor) = self.backdoor.take() {
            backdoor.join();
        }
        true
    }
}

impl Drop for ThreadRunner {
    fn drop(&mut self) {
        // Never leave detached workers behind
        self.request_stop();
        self.wait(None);
    }
}

fn work_loop(stats: &WorkerStats, interval: Duration, stop_rx: &Receiver<()>) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            // Disconnected: the runner dropped its sender
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
