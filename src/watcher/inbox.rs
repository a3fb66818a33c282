//! Inbox watcher: the single dispatcher that feeds files through the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::engine::DocumentEngine;
use crate::paths::WatchConfig;
use crate::pipeline::{Discovery, FileOutcome, IncomingFile, Pipeline, PipelineError};

use super::claims::{Claim, ClaimRegistry};
use super::error::WatchError;
use super::filter::InboxFilter;

/// Counters for one dispatcher run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Exported and removed from the inbox.
    pub relocated: usize,
    /// Reached a failed terminal state; the source stays in the inbox.
    pub failed: usize,
    /// Given up before opening (readiness timeout or shutdown).
    pub abandoned: usize,
    /// Reports skipped by the duplicate guard.
    pub duplicates: usize,
}

impl DispatchStats {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Relocated { .. } => self.relocated += 1,
            FileOutcome::Abandoned(_) => self.abandoned += 1,
            _ => self.failed += 1,
        }
    }

    /// Files that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.relocated + self.failed + self.abandoned
    }
}

impl fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} relocated, {} failed, {} abandoned, {} duplicate(s) skipped",
            self.relocated, self.failed, self.abandoned, self.duplicates
        )
    }
}

/// Watches the inbox and processes each arriving document one at a time.
///
/// The directory listener runs on notify's own thread and only forwards
/// events into a bounded channel. All processing happens on the task that
/// awaits [`InboxWatcher::run`], so at most one document session exists.
pub struct InboxWatcher<E: DocumentEngine> {
    config: WatchConfig,
    filter: InboxFilter,
    pipeline: Pipeline<E>,
    claims: ClaimRegistry,
    stats: DispatchStats,
    event_buffer: usize,
}

impl<E: DocumentEngine> InboxWatcher<E> {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> InboxWatcherBuilder<E> {
        InboxWatcherBuilder::new()
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Process the startup backlog, then every arrival until `shutdown`.
    ///
    /// The listener is attached before the backlog scan. Events queued while
    /// the backlog runs are handled afterwards; the claim registry drops the
    /// ones that refer to files already processed.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<DispatchStats, WatchError> {
        let input_dir = self.config.input_dir().to_path_buf();
        let (tx, mut rx) = mpsc::channel(self.event_buffer);

        let listener_shutdown = shutdown.clone();
        let mut listener = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if listener_shutdown.is_cancelled() {
                return;
            }
            let _ = tx.blocking_send(res);
        })?;

        listener
            .watch(&input_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: input_dir.clone(),
                reason: e.to_string(),
            })?;

        crate::log_event!("watcher", "watching", "{}", input_dir.display());

        self.drain_backlog(&shutdown).await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    crate::log_event!("watcher", "shutdown requested");
                    break;
                }

                received = rx.recv() => match received {
                    Some(Ok(event)) => {
                        for path in self.filter.arrivals(&event) {
                            if shutdown.is_cancelled() {
                                break;
                            }
                            self.dispatch(path, Discovery::Event, &shutdown).await;
                        }
                    }
                    Some(Err(e)) => {
                        let error = WatchError::EventError {
                            reason: e.to_string(),
                        };
                        tracing::error!("[watcher] {error}");
                    }
                    None => return Err(WatchError::ChannelClosed),
                },
            }
        }

        // Closing the receiver first releases a listener blocked on a full channel
        drop(rx);
        drop(listener);

        crate::log_event!("watcher", "stopped", "{}", self.stats);
        Ok(self.stats)
    }

    /// Process only the files already in the inbox, without a listener.
    pub async fn run_backlog(mut self, shutdown: CancellationToken) -> DispatchStats {
        self.drain_backlog(&shutdown).await;
        crate::log_event!("watcher", "backlog done", "{}", self.stats);
        self.stats
    }

    async fn drain_backlog(&mut self, shutdown: &CancellationToken) {
        let backlog = scan_backlog(self.config.input_dir(), &self.filter).await;
        if !backlog.is_empty() {
            crate::log_event!("watcher", "backlog", "{} file(s)", backlog.len());
        }

        for path in backlog {
            if shutdown.is_cancelled() {
                break;
            }
            self.dispatch(path, Discovery::Backlog, shutdown).await;
        }
    }

    async fn dispatch(&mut self, path: PathBuf, discovery: Discovery, shutdown: &CancellationToken) {
        match self.claims.claim(&path).await {
            Claim::Accepted => {}
            Claim::Duplicate => {
                self.stats.duplicates += 1;
                crate::debug_event!("dispatch", "duplicate", "{}", path.display());
                return;
            }
            Claim::Missing => {
                crate::debug_event!("dispatch", "gone", "{}", path.display());
                return;
            }
        }

        let file = IncomingFile::new(path, discovery);
        crate::log_event!("dispatch", "discovered", "{}", file.path.display());

        let outcome = self.pipeline.process(&file, shutdown).await;
        report_outcome(&file, &outcome);

        self.stats.record(&outcome);
        self.claims.settle(&file.path).await;
    }
}

/// List matching files in the inbox in directory-listing order.
///
/// The order is whatever the filesystem yields and is not sorted. A listing
/// error is logged and ends the scan; files already listed are kept.
pub async fn scan_backlog(dir: &Path, filter: &InboxFilter) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("[watcher] cannot list {}: {e}", dir.display());
            return found;
        }
    };

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                let is_file = entry.file_type().await.is_ok_and(|kind| kind.is_file());
                if is_file && filter.matches(&path) {
                    found.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("[watcher] listing {} failed: {e}", dir.display());
                break;
            }
        }
    }

    found
}

fn report_outcome(file: &IncomingFile, outcome: &FileOutcome) {
    let path = file.path.display();
    let elapsed_ms = (Local::now() - file.discovered_at).num_milliseconds();

    match outcome {
        FileOutcome::Relocated { export, .. } => {
            crate::log_event!(
                "dispatch",
                "done",
                "{path}: {} section(s) in {elapsed_ms}ms",
                export.artifacts.len()
            );
        }
        FileOutcome::RelocationFailed { export, relocation } => {
            for failure in &relocation.failures {
                tracing::error!("[relocate] {failure}");
            }
            tracing::error!(
                "[dispatch] {path}: exported {} section(s) but relocation failed, left in inbox",
                export.artifacts.len()
            );
        }
        FileOutcome::ExportFailed(failure) => {
            tracing::error!("[dispatch] {path}: {failure}, left in inbox");
        }
        FileOutcome::OpenFailed(e) | FileOutcome::Inaccessible(e) => {
            tracing::error!("[dispatch] {path}: {e}");
        }
        FileOutcome::Abandoned(PipelineError::Cancelled) => {
            crate::log_event!("dispatch", "left in inbox", "{path} (shutdown)");
        }
        FileOutcome::Abandoned(e) => {
            tracing::warn!("[dispatch] {path}: {e}, left in inbox");
        }
    }
}

/// Builder for constructing an [`InboxWatcher`].
pub struct InboxWatcherBuilder<E: DocumentEngine> {
    config: Option<WatchConfig>,
    engine: Option<Arc<E>>,
    settings: Settings,
}

impl<E: DocumentEngine> InboxWatcherBuilder<E> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: None,
            engine: None,
            settings: Settings::default(),
        }
    }

    /// Set the resolved directories.
    pub fn config(mut self, config: WatchConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document engine.
    pub fn engine(mut self, engine: Arc<E>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the runtime settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the InboxWatcher.
    pub fn build(self) -> Result<InboxWatcher<E>, WatchError> {
        let config = self.config.ok_or_else(|| WatchError::InitFailed {
            reason: "Directory configuration is required".to_string(),
        })?;

        let engine = self.engine.ok_or_else(|| WatchError::InitFailed {
            reason: "Document engine is required".to_string(),
        })?;

        let watch = &self.settings.watch;
        Ok(InboxWatcher {
            filter: InboxFilter::new(watch.extension()),
            pipeline: Pipeline::new(engine, &config, &self.settings),
            claims: ClaimRegistry::new(),
            stats: DispatchStats::default(),
            event_buffer: watch.event_buffer.max(1),
            config,
        })
    }
}

impl<E: DocumentEngine> Default for InboxWatcherBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
