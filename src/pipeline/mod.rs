//! Per-file ingestion pipeline.
//!
//! # Lifecycle
//!
//! ```text
//! Discovered
//!   -> ReadinessGate (poll while locked)
//!   -> SessionSlot::open (poll until the engine reports ready)
//!   -> SectionExporter (one artifact per section, ascending order)
//!   -> session closed (commit = export succeeded)
//!   -> FileLifecycleManager (copy, archive, delete)
//! ```
//!
//! Terminal outcomes are described by [`FileOutcome`]. Only a relocated file
//! leaves the inbox; every other outcome keeps the source where it was.

mod error;
mod exporter;
mod lifecycle;
mod readiness;
mod session;

pub use error::PipelineError;
pub use exporter::{
    ExportFailure, ExportReport, OutputArtifact, SectionExporter, SectionRecord, sanitize_label,
};
pub use lifecycle::{FileLifecycleManager, RelocationError, RelocationReport, RelocationStep};
pub use readiness::{Fingerprint, Readiness, ReadinessGate, probe};
pub use session::{DocumentSession, OpenPolicy, SessionSlot};

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::engine::DocumentEngine;
use crate::paths::WatchConfig;

/// How a file came to the dispatcher's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// Present in the inbox at startup.
    Backlog,
    /// Reported by the directory listener.
    Event,
}

/// A file observed in the inbox.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub path: PathBuf,
    pub discovered_at: DateTime<Local>,
    pub discovery: Discovery,
}

impl IncomingFile {
    pub fn new(path: PathBuf, discovery: Discovery) -> Self {
        Self {
            path,
            discovered_at: Local::now(),
            discovery,
        }
    }
}

/// Terminal state of one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Exported, copied (and archived) and deleted from the inbox.
    Relocated {
        export: ExportReport,
        relocation: RelocationReport,
    },
    /// Exported, but a copy or the delete failed. Completed steps are kept.
    RelocationFailed {
        export: ExportReport,
        relocation: RelocationReport,
    },
    /// A section failed to export; the source stays in the inbox.
    ExportFailed(ExportFailure),
    /// The engine could not open the document.
    OpenFailed(PipelineError),
    /// The file could not be accessed at all.
    Inaccessible(PipelineError),
    /// Given up before opening: readiness timeout or shutdown.
    Abandoned(PipelineError),
}

impl FileOutcome {
    pub fn is_relocated(&self) -> bool {
        matches!(self, FileOutcome::Relocated { .. })
    }

    /// Short state name for logs and stats.
    pub fn state(&self) -> &'static str {
        match self {
            FileOutcome::Relocated { .. } => "relocated",
            FileOutcome::RelocationFailed { .. } => "relocation failed",
            FileOutcome::ExportFailed(_) => "export failed",
            FileOutcome::OpenFailed(_) => "open failed",
            FileOutcome::Inaccessible(_) => "inaccessible",
            FileOutcome::Abandoned(_) => "abandoned",
        }
    }
}

/// Runs one file at a time from discovery to a terminal outcome.
pub struct Pipeline<E: DocumentEngine> {
    gate: ReadinessGate,
    sessions: SessionSlot<E>,
    exporter: SectionExporter,
    lifecycle: FileLifecycleManager,
}

impl<E: DocumentEngine> Pipeline<E> {
    pub fn new(engine: Arc<E>, config: &WatchConfig, settings: &Settings) -> Self {
        let watch = &settings.watch;
        Self {
            gate: ReadinessGate::new(watch.poll_interval(), watch.readiness_timeout()),
            sessions: SessionSlot::new(
                engine,
                OpenPolicy {
                    interval: watch.poll_interval(),
                    timeout: watch.open_timeout(),
                },
            ),
            exporter: SectionExporter::new(config.output_dir(), watch.extension()),
            lifecycle: FileLifecycleManager::new(config, &settings.relocation),
        }
    }

    pub fn sessions(&self) -> &SessionSlot<E> {
        &self.sessions
    }

    /// Process one file to a terminal outcome.
    ///
    /// Shutdown is honoured only while waiting for the file or the engine.
    /// Once export begins the file runs through relocation.
    pub async fn process(
        &mut self,
        file: &IncomingFile,
        shutdown: &CancellationToken,
    ) -> FileOutcome {
        let path = &file.path;

        match self.gate.wait(path, shutdown).await {
            Ok(0) => {}
            Ok(_) => crate::log_event!("readiness", "unlocked", "{}", path.display()),
            Err(e @ PipelineError::Inaccessible { .. }) => return FileOutcome::Inaccessible(e),
            Err(e) => return FileOutcome::Abandoned(e),
        }

        let session = match self.sessions.open(path, shutdown).await {
            Ok(session) => session,
            Err(e) if e.is_open_failure() => return FileOutcome::OpenFailed(e),
            Err(e) => return FileOutcome::Abandoned(e),
        };

        let export = self.exporter.export(session).await;

        // The engine must let go of the source before it is copied and deleted
        self.sessions.finish(export.is_ok()).await;

        let export = match export {
            Ok(report) => report,
            Err(failure) => return FileOutcome::ExportFailed(failure),
        };

        let relocation = self.lifecycle.relocate(path).await;
        if relocation.is_complete() {
            FileOutcome::Relocated { export, relocation }
        } else {
            FileOutcome::RelocationFailed { export, relocation }
        }
    }
}
