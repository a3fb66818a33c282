//! Config command - print the effective settings.

use anyhow::Context;

use crate::config::Settings;

/// Print `settings` as TOML to stdout.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let rendered = settings
        .to_toml()
        .context("Failed to render settings as TOML")?;

    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    print!("{rendered}");
    Ok(())
}
