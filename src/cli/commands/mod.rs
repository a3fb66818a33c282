//! Command implementations for the CLI.

pub mod config;
pub mod watch;
