//! Command-line interface: argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::ffi::OsStr;

/// Usage text printed for `/?`, kept compatible with existing scripts.
pub const LEGACY_USAGE: &str = "\
Default input path is working directory
Output is \"out\" directory inside working directory
Copy path is \"copy\" directory inside working directory
First parameter: input path
Second parameter: output path
Third parameter: copy path
Fourth parameter: archive path, optional
";

/// Whether the first argument asks for the legacy usage text.
pub fn is_legacy_help(first_arg: Option<&OsStr>) -> bool {
    first_arg.is_some_and(|arg| arg == "/?")
}
