//! Process-wide shutdown state.
//!
//! The supervisor loop and the single-shot runner both block on the
//! shutdown channel while idle, so Ctrl+C interrupts a poll-interval wait
//! immediately instead of after the next tick.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the control loop
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a control loop has registered:
/// - Before `shutdown_channel()`: nothing to drain, exit immediately
/// - After `shutdown_channel()`: set the flag and wake the loop, which
///   stops the active worker set before returning
/// - A second Ctrl+C while draining exits without waiting
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            crate::log!("run"; "forced exit");
            std::process::exit(130);
        }

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                crate::log!("run"; "shutting down...");
                let _ = tx.send(());
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Create the shutdown channel and register its sender with the handler.
///
/// Only the first call registers. Later calls return an already
/// disconnected receiver, which control loops treat as a shutdown.
pub fn shutdown_channel() -> Receiver<()> {
    let (tx, rx) = channel::unbounded();
    let _ = SHUTDOWN_TX.set(tx);
    rx
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
