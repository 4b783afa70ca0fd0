//! Reload supervisor: the control loop tying resolver, watcher and
//! lifecycle together.
//!
//! ```text
//! startup: resolve ─► baseline ─► start
//!
//! loop (every poll interval, until shutdown):
//!     poll ─► changed? ─► stop (drain) ─► reresolve ─► start ─► baseline
//!                                              │          │
//!                                              └── error ─┴─► log, baseline old ∪ new,
//!                                                             apply failure policy
//! shutdown: stop (drain)
//! ```
//!
//! Everything happens on the calling thread. The only suspension points are
//! the poll wait, which the shutdown channel interrupts, and the drain wait
//! inside `WorkerSetLifecycle::stop`.


use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use thiserror::Error;

use crate::config::{FailurePolicy, SupervisorConfig};
use crate::core::is_shutdown;
use crate::lifecycle::{LifecycleError, WorkerSetLifecycle};
use crate::logger;
use crate::resolve::{
    Identifier, ResolveError, SourceResolver, WorkerClassRef, class_names, package_members,
};
use crate::runner::RunnerFactory;
use crate::utils::plural::plural_count;
use crate::watch::ChangeWatcher;
use crate::{debug, log};

/// Errors that abort startup. Once polling has begun nothing escapes the loop.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Reload counters for the current process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    pub reloads: usize,
    pub failures: usize,
}

/// What one poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Unchanged,
    Reloaded,
    /// Reload attempted and failed; the failure policy has been applied
    Failed,
    /// The old set did not drain in time; retried on the next tick
    Deferred,
}

pub struct ReloadSupervisor<F: RunnerFactory> {
    identifiers: Vec<Identifier>,
    resolver: SourceResolver,
    watcher: ChangeWatcher,
    lifecycle: WorkerSetLifecycle<F>,
    policy: FailurePolicy,
    poll_interval: Duration,
    /// Paths of the current baseline
    watched: Vec<PathBuf>,
    /// Classes of the last set that started successfully
    last_good: Vec<WorkerClassRef>,
    stats: ReloadStats,
}

impl<F: RunnerFactory> ReloadSupervisor<F> {
    pub fn new(config: &SupervisorConfig, identifiers: Vec<Identifier>, factory: F) -> Self {
        Self {
            identifiers,
            resolver: SourceResolver::new(&config.root),
            watcher: ChangeWatcher::new(config.reload.content_hash),
            lifecycle: WorkerSetLifecycle::new(factory, config.reload.stop_timeout()),
            policy: config.reload.on_failure,
            poll_interval: config.reload.poll_interval(),
            watched: Vec::new(),
            last_good: Vec::new(),
            stats: ReloadStats::default(),
        }
    }

    pub fn stats(&self) -> ReloadStats {
        self.stats
    }

    pub fn lifecycle(&self) -> &WorkerSetLifecycle<F> {
        &self.lifecycle
    }

    pub fn watcher(&self) -> &ChangeWatcher {
        &self.watcher
    }

    /// Startup, poll until `shutdown_rx` fires or disconnects, then stop.
    pub fn run(&mut self, shutdown_rx: &Receiver<()>) -> Result<(), SupervisorError> {
        self.startup()?;
        log!(
            "watch";
            "polling {} every {:?}",
            plural_count(self.watcher.len(), "path"),
            self.poll_interval
        );

        loop {
            match shutdown_rx.recv_timeout(self.poll_interval) {
                Err(RecvTimeoutError::Timeout) => {
                    self.tick();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Resolve, baseline and start the initial worker set.
    pub fn startup(&mut self) -> Result<(), SupervisorError> {
        let resolution = self.resolver.resolve(&self.identifiers, false)?;

        self.watched = resolution.watch_paths();
        self.watcher.baseline(self.watched.iter().cloned());

        log!(
            "run";
            "starting {} from {}: {}",
            plural_count(resolution.classes.len(), "worker"),
            plural_count(resolution.locations.len(), "location"),
            resolution.class_names()
        );
        self.lifecycle.start(&resolution.classes)?;
        self.last_good = resolution.classes;
        Ok(())
    }

    /// Poll once and run a reload cycle when something changed.
    pub fn tick(&mut self) -> TickOutcome {
        let changed = self.watcher.poll();
        if changed.is_empty() {
            return TickOutcome::Unchanged;
        }
        self.reload(&changed)
    }

    fn reload(&mut self, changed: &[PathBuf]) -> TickOutcome {
        logger::status_detach();
        for path in changed {
            log!("reload"; "changed: {}", self.display_path(path));
        }

        if let Err(err) = self.lifecycle.stop() {
            logger::status_warning(&format!("{err}, retrying on next poll"));
            return TickOutcome::Deferred;
        }
        if is_shutdown() {
            return TickOutcome::Deferred;
        }

        let resolution = match self.resolver.resolve(&self.identifiers, true) {
            Ok(resolution) => resolution,
            Err(err) => {
                let offending = err.path().map(Path::to_path_buf).into_iter().collect();
                return self.fail(anyhow::Error::new(err), offending);
            }
        };

        if let Err(err) = self.lifecycle.start(&resolution.classes) {
            return self.fail(anyhow::Error::new(err), resolution.watch_paths());
        }

        self.watched = resolution.watch_paths();
        self.watcher.baseline(self.watched.iter().cloned());
        self.stats.reloads += 1;
        logger::status_success(&format!("reloaded: {}", resolution.class_names()));
        self.last_good = resolution.classes;
        TickOutcome::Reloaded
    }

    /// Log a failed reload, advance the baseline and apply the failure policy.
    ///
    /// The baseline covers the previous paths, any newly resolved ones, the
    /// manifest the error points at and the current members of every watched
    /// package. The same broken edit is not retried on every poll, while a
    /// fix to any file involved still triggers the next attempt.
    fn fail(&mut self, err: anyhow::Error, new_paths: Vec<PathBuf>) -> TickOutcome {
        self.stats.failures += 1;
        logger::status_error("reload failed", &format!("{err:#}"));

        let members: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|path| path.is_dir())
            .filter_map(|dir| package_members(dir).ok())
            .flatten()
            .collect();
        for path in new_paths.into_iter().chain(members) {
            if !self.watched.contains(&path) {
                self.watched.push(path);
            }
        }
        self.watcher.baseline(self.watched.iter().cloned());

        match self.policy {
            FailurePolicy::StayStopped => {
                log!("reload"; "workers stay stopped until the next successful reload");
            }
            FailurePolicy::RestartPrevious => self.restart_previous(),
        }
        TickOutcome::Failed
    }

    fn restart_previous(&mut self) {
        if self.last_good.is_empty() {
            return;
        }

        let previous = self.last_good.clone();
        match self.lifecycle.start(&previous) {
            Ok(()) => log!("reload"; "restarted previous set: {}", class_names(&previous)),
            Err(err) => log!("error"; "previous set failed to start too: {:#}", anyhow::Error::new(err)),
        }
    }

    /// Final graceful stop. Keeps waiting while the drain times out.
    pub fn shutdown(&mut self) {
        debug!("run"; "stopping {}", class_names(self.lifecycle.classes()));
        while let Err(err) = self.lifecycle.stop() {
            log!("warning"; "{}, still waiting", err);
        }
        log!(
            "run";
            "stopped ({}, {})",
            plural_count(self.stats.reloads, "reload"),
            plural_count(self.stats.failures, "failure")
        );
    }

    fn display_path<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(self.resolver.root())
            .unwrap_or(path)
            .display()
    }
}

/// Run without watching: resolve, start, wait for shutdown, stop.
pub fn run_once<F: RunnerFactory>(
    config: &SupervisorConfig,
    identifiers: &[Identifier],
    factory: F,
    shutdown_rx: &Receiver<()>,
) -> Result<(), SupervisorError> {
    let resolution = SourceResolver::new(&config.root).resolve(identifiers, false)?;
    let mut lifecycle = WorkerSetLifecycle::new(factory, config.reload.stop_timeout());

    log!(
        "run";
        "starting {}: {}",
        plural_count(resolution.classes.len(), "worker"),
        resolution.class_names()
    );
    lifecycle.start(&resolution.classes)?;

    // Ok or Disconnected: either way it is time to stop
    let _ = shutdown_rx.recv();

    while let Err(err) = lifecycle.stop() {
        log!("warning"; "{}, still waiting", err);
    }
    log!("run"; "stopped");
    Ok(())
}
