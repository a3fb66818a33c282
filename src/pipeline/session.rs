//! Document sessions and the single-session slot.
//!
//! The engine is a single shared instance, so at most one document may be
//! open at a time. [`SessionSlot`] owns the only live [`DocumentSession`]
//! and closes any leftover session before opening the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::PipelineError;
use crate::engine::DocumentEngine;

/// An opened document, owned by the dispatcher for one file.
pub struct DocumentSession<E: DocumentEngine> {
    engine: Arc<E>,
    handle: E::Session,
    source: PathBuf,
    opened_at: Instant,
}

impl<E: DocumentEngine> DocumentSession<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn handle(&self) -> &E::Session {
        &self.handle
    }

    /// Path the session was opened from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    async fn close(self, commit: bool) {
        crate::debug_event!(
            "session",
            if commit { "commit" } else { "abandon" },
            "{} after {:?}",
            self.source.display(),
            self.opened_at.elapsed()
        );
        self.engine.close(self.handle, commit).await;
    }
}

/// How long and how often to poll the engine while a document opens.
#[derive(Debug, Clone, Copy)]
pub struct OpenPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

/// Holds the engine and at most one open session.
pub struct SessionSlot<E: DocumentEngine> {
    engine: Arc<E>,
    active: Option<DocumentSession<E>>,
    policy: OpenPolicy,
}

impl<E: DocumentEngine> SessionSlot<E> {
    pub fn new(engine: Arc<E>, policy: OpenPolicy) -> Self {
        Self {
            engine,
            active: None,
            policy,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&DocumentSession<E>> {
        self.active.as_ref()
    }

    /// Open `path` and wait until the engine reports the session valid.
    ///
    /// A session still open from an earlier file is abandoned first.
    pub async fn open(
        &mut self,
        path: &Path,
        shutdown: &CancellationToken,
    ) -> Result<&DocumentSession<E>, PipelineError> {
        if let Some(previous) = self.active.take() {
            tracing::warn!(
                "[session] closing leftover session for {}",
                previous.source.display()
            );
            previous.close(false).await;
        }

        let handle = self.engine.open(path).await.map_err(PipelineError::Open)?;
        let started = Instant::now();
        let mut polls = 0u32;

        while !self.engine.is_ready(&handle).await {
            polls += 1;
            if let Some(limit) = self.policy.timeout {
                if started.elapsed() >= limit {
                    self.engine.close(handle, false).await;
                    return Err(PipelineError::OpenTimeout {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
            }

            crate::debug_event!("session", "opening", "{} (poll {polls})", path.display());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.engine.close(handle, false).await;
                    return Err(PipelineError::Cancelled);
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        crate::log_event!(self.engine.name(), "opened", "{}", path.display());

        Ok(self.active.insert(DocumentSession {
            engine: Arc::clone(&self.engine),
            handle,
            source: path.to_path_buf(),
            opened_at: started,
        }))
    }

    /// Close the active session, if any.
    pub async fn finish(&mut self, commit: bool) {
        if let Some(session) = self.active.take() {
            session.close(commit).await;
        }
    }
}
