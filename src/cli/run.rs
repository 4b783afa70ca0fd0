//! `hotwire run`: start workers, optionally under the reload supervisor.

use anyhow::{Context, Result};

use crate::config::SupervisorConfig;
use crate::core::shutdown_channel;
use crate::resolve::Identifier;
use crate::runner::ThreadRunnerFactory;
use crate::supervisor::{ReloadSupervisor, run_once};
use crate::{debug, log};

pub fn run_workers(config: &SupervisorConfig, identifiers: &[String], reload: bool) -> Result<()> {
    let identifiers = Identifier::parse_all(identifiers)?;
    let factory = ThreadRunnerFactory::new(config);
    let shutdown_rx = shutdown_channel();

    debug!("run"; "broker: {}", config.broker_uri);
    debug!("run"; "root: {}", config.root.display());

    if !reload {
        return run_once(config, &identifiers, factory, &shutdown_rx)
            .context("failed to start workers");
    }

    log!(
        "reload";
        "watching manifests under {} (on failure: {})",
        config.root.display(),
        config.reload.on_failure.label()
    );
    ReloadSupervisor::new(config, identifiers, factory)
        .run(&shutdown_rx)
        .context("failed to start workers")
}
