//! Arrival detection: which filesystem events introduce a new inbox file.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Matches documents of one extension, case-insensitively.
#[derive(Debug, Clone)]
pub struct InboxFilter {
    extension: String,
}

impl InboxFilter {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Whether the path carries the watched extension.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// Paths of files that arrived with this event.
    ///
    /// Creations, renames into the directory and a writer closing the file
    /// count as arrivals. For a rename reported with both ends, only the
    /// destination is returned.
    pub fn arrivals(&self, event: &Event) -> Vec<PathBuf> {
        let candidates: &[PathBuf] = match event.kind {
            EventKind::Create(_) => &event.paths,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.last().map(std::slice::from_ref).unwrap_or(&[])
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => &event.paths,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => &event.paths,
            _ => &[],
        };

        candidates
            .iter()
            .filter(|path| self.matches(path))
            .cloned()
            .collect()
    }
}
