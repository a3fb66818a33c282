//! Shared fixtures for integration tests.
//!
//! `ScriptedEngine` stands in for a real document engine: a "document" is a
//! text file whose lines are the section labels. Every engine call is
//! recorded so tests can assert on session handling.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use docsplit::config::Settings;
use docsplit::engine::{DocumentEngine, EngineError};
use docsplit::paths::{PathArgs, WatchConfig};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Open(PathBuf),
    Extract { index: usize, destination: PathBuf },
    Close { path: PathBuf, commit: bool },
}

#[derive(Debug, Default)]
pub struct ScriptedEngine {
    journal: Mutex<Vec<EngineCall>>,
    fail_open: bool,
    fail_extract_at: Option<usize>,
    not_ready_polls: usize,
}

pub struct ScriptedSession {
    path: PathBuf,
    labels: Vec<String>,
    polls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `open` fails.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Extraction of section `index` fails.
    pub fn failing_extract_at(mut self, index: usize) -> Self {
        self.fail_extract_at = Some(index);
        self
    }

    /// Sessions report not-ready for the first `polls` checks.
    pub fn not_ready_for(mut self, polls: usize) -> Self {
        self.not_ready_polls = polls;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.lock().clone()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Open(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<(PathBuf, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Close { path, commit } => Some((path, commit)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.journal.lock().push(call);
    }
}

#[async_trait]
impl DocumentEngine for ScriptedEngine {
    type Session = ScriptedSession;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, path: &Path) -> Result<ScriptedSession, EngineError> {
        self.record(EngineCall::Open(path.to_path_buf()));
        if self.fail_open {
            return Err(EngineError::Open {
                path: path.to_path_buf(),
                reason: "scripted open failure".to_string(),
            });
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(ScriptedSession {
            path: path.to_path_buf(),
            labels: text.lines().map(str::to_string).collect(),
            polls: AtomicUsize::new(0),
        })
    }

    async fn is_ready(&self, session: &ScriptedSession) -> bool {
        session.polls.fetch_add(1, Ordering::SeqCst) >= self.not_ready_polls
    }

    fn document_name(&self, session: &ScriptedSession) -> Result<String, EngineError> {
        let name = session
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Ok(name.strip_suffix(".pdf").unwrap_or(name).to_string())
    }

    fn section_count(&self, session: &ScriptedSession) -> Result<usize, EngineError> {
        Ok(session.labels.len())
    }

    fn section_label(&self, session: &ScriptedSession, index: usize) -> Result<String, EngineError> {
        session
            .labels
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::Query {
                operation: "section_label",
                reason: format!("no section {index}"),
            })
    }

    async fn extract_section(
        &self,
        session: &ScriptedSession,
        index: usize,
        destination: &Path,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::Extract {
            index,
            destination: destination.to_path_buf(),
        });
        if self.fail_extract_at == Some(index) {
            return Err(EngineError::Extract {
                index,
                destination: destination.to_path_buf(),
                reason: "scripted extract failure".to_string(),
            });
        }

        tokio::fs::write(destination, &session.labels[index])
            .await
            .map_err(|e| EngineError::Extract {
                index,
                destination: destination.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn close(&self, session: ScriptedSession, commit: bool) {
        self.record(EngineCall::Close {
            path: session.path,
            commit,
        });
    }
}

/// A scratch inbox with the default `out` directory in place.
pub struct Inbox {
    pub temp: TempDir,
    pub input: PathBuf,
}

impl Inbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("inbox");
        std::fs::create_dir_all(input.join("out")).unwrap();
        Self { temp, input }
    }

    /// Directory layout with defaults for output and copy.
    pub fn config(&self) -> WatchConfig {
        WatchConfig::resolve_in(
            PathArgs {
                input: Some(self.input.clone()),
                ..Default::default()
            },
            self.temp.path(),
        )
        .unwrap()
    }

    /// Same as [`Inbox::config`] plus an archive directory next to the inbox.
    pub fn config_with_archive(&self) -> WatchConfig {
        WatchConfig::resolve_in(
            PathArgs {
                input: Some(self.input.clone()),
                archive: Some(self.temp.path().join("archive")),
                ..Default::default()
            },
            self.temp.path(),
        )
        .unwrap()
    }

    /// Drop a scripted document whose sections carry `labels`.
    pub fn drop_document(&self, name: &str, labels: &[&str]) -> PathBuf {
        let path = self.input.join(name);
        std::fs::write(&path, labels.join("\n")).unwrap();
        path
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.input.join("out").join(name)
    }

    pub fn copied(&self, name: &str) -> PathBuf {
        self.input.join("copy").join(name)
    }
}

/// Settings with short poll intervals for tests.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.watch.poll_interval_ms = 10;
    settings
}

pub fn engine(engine: ScriptedEngine) -> Arc<ScriptedEngine> {
    Arc::new(engine)
}
