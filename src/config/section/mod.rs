//! Configuration section definitions.

mod logging;
mod reload;

pub use logging::{LogLevel, LoggingConfig};
pub use reload::{FailurePolicy, ReloadConfig};
