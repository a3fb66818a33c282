//! Watch command - resolve directories and run the dispatcher until shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::engine::PdfEngine;
use crate::paths::{PathArgs, WatchConfig};
use crate::watcher::{DispatchStats, InboxWatcher};

/// Arguments for the watch command.
pub struct WatchArgs {
    pub paths: PathArgs,
    /// Stop after the startup backlog instead of watching.
    pub once: bool,
}

/// Run the watch command.
///
/// Directory errors are fatal and reported before anything is processed.
pub async fn run(args: WatchArgs, settings: Settings) -> anyhow::Result<DispatchStats> {
    let WatchArgs { paths, once } = args;

    let config = WatchConfig::resolve(paths).context("Invalid directory configuration")?;
    for (role, dir) in config.directories() {
        crate::log_event!("startup", "directory", "{role}: {}", dir.display());
    }

    let watcher = InboxWatcher::builder()
        .config(config)
        .engine(Arc::new(PdfEngine::new()))
        .settings(settings)
        .build()?;

    let shutdown = CancellationToken::new();
    let signal_ct = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                crate::log_event!("watcher", "shutting down");
                signal_ct.cancel();
            }
            Err(e) => tracing::error!("[watcher] cannot listen for Ctrl+C: {e}"),
        }
    });

    if once {
        Ok(watcher.run_backlog(shutdown).await)
    } else {
        let stats = watcher.run(shutdown).await?;
        Ok(stats)
    }
}
