//! Athena CLI library.
//!
//! Exposes the argument parser and command implementations so they can be
//! driven from tests without spawning the binary.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, OutputFormat, TuningArgs};
pub use commands::{execute, load_messages};
