//! Command-line interface module.

mod args;
pub mod list;
pub mod run;
pub mod show;

pub use args::{Cli, Commands, ConfigArgs};
