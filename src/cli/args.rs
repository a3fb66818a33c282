//! CLI argument parsing using clap.

use clap::{
    Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::paths::PathArgs;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Inbox document splitter
#[derive(Parser, Debug)]
#[command(
    name = "docsplit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch an inbox and split each arriving document into one file per section",
    long_about = "Watch an inbox and split each arriving document into one file per section.\n\n\
                  Omitted directories default to the working directory (input), \
                  \"out\" and \"copy\" inside the input directory. \
                  Run `docsplit /?` for the short usage text.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Directory to watch [default: working directory]
    pub input: Option<PathBuf>,

    /// Directory receiving one file per section [default: INPUT/out]
    pub output: Option<PathBuf>,

    /// Directory receiving a copy of each processed source [default: INPUT/copy]
    pub copy: Option<PathBuf>,

    /// Optional second copy destination for processed sources
    pub archive: Option<PathBuf>,

    /// Path to custom settings.toml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Process the files already in the inbox, then exit
    #[arg(long)]
    pub once: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// The positional directory arguments.
    pub fn path_args(&self) -> PathArgs {
        PathArgs {
            input: self.input.clone(),
            output: self.output.clone(),
            copy: self.copy.clone(),
            archive: self.archive.clone(),
        }
    }
}
