//! Relocation of an exported source file.
//!
//! The source is copied to the copy directory and, when configured, the
//! archive directory. Both copies are attempted independently. The source is
//! deleted from the inbox only after every copy succeeded. Nothing is rolled
//! back on failure.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::RelocationSettings;
use crate::paths::WatchConfig;

/// A single relocation side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationStep {
    Copy,
    Archive,
    Delete,
}

impl fmt::Display for RelocationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelocationStep::Copy => "copy",
            RelocationStep::Archive => "archive",
            RelocationStep::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One failed relocation step.
#[derive(Error, Debug)]
#[error("{step} of {} failed: {source}", .target.display())]
pub struct RelocationError {
    pub step: RelocationStep,
    pub target: PathBuf,
    #[source]
    pub source: io::Error,
}

/// What relocation did for one file.
#[derive(Debug, Default)]
pub struct RelocationReport {
    pub copied_to: Option<PathBuf>,
    pub archived_to: Option<PathBuf>,
    pub deleted: bool,
    pub failures: Vec<RelocationError>,
}

impl RelocationReport {
    /// Every step ran and the source is gone from the inbox.
    pub fn is_complete(&self) -> bool {
        self.deleted && self.failures.is_empty()
    }
}

/// Copies, archives and removes successfully exported sources.
#[derive(Debug, Clone)]
pub struct FileLifecycleManager {
    copy_dir: PathBuf,
    archive_dir: Option<PathBuf>,
    overwrite: bool,
    create_missing_dirs: bool,
}

impl FileLifecycleManager {
    pub fn new(config: &WatchConfig, settings: &RelocationSettings) -> Self {
        Self {
            copy_dir: config.copy_dir().to_path_buf(),
            archive_dir: config.archive_dir().map(Path::to_path_buf),
            overwrite: settings.overwrite,
            create_missing_dirs: settings.create_missing_dirs,
        }
    }

    /// Relocate `source`. Failures are collected in the report, never retried.
    pub async fn relocate(&self, source: &Path) -> RelocationReport {
        let mut report = RelocationReport::default();

        let Some(file_name) = source.file_name() else {
            report.failures.push(RelocationError {
                step: RelocationStep::Copy,
                target: source.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
            });
            return report;
        };

        let copy_target = self.copy_dir.join(file_name);
        match self.copy_into(source, &self.copy_dir, &copy_target).await {
            Ok(()) => {
                crate::log_event!("relocate", "copied", "{}", copy_target.display());
                report.copied_to = Some(copy_target);
            }
            Err(error) => report.failures.push(RelocationError {
                step: RelocationStep::Copy,
                target: copy_target,
                source: error,
            }),
        }

        if let Some(archive_dir) = &self.archive_dir {
            let archive_target = archive_dir.join(file_name);
            match self.copy_into(source, archive_dir, &archive_target).await {
                Ok(()) => {
                    crate::log_event!("relocate", "archived", "{}", archive_target.display());
                    report.archived_to = Some(archive_target);
                }
                Err(error) => report.failures.push(RelocationError {
                    step: RelocationStep::Archive,
                    target: archive_target,
                    source: error,
                }),
            }
        }

        if !report.failures.is_empty() {
            return report;
        }

        match tokio::fs::remove_file(source).await {
            Ok(()) => {
                crate::log_event!("relocate", "deleted", "{}", source.display());
                report.deleted = true;
            }
            Err(error) => report.failures.push(RelocationError {
                step: RelocationStep::Delete,
                target: source.to_path_buf(),
                source: error,
            }),
        }

        report
    }

    async fn copy_into(&self, source: &Path, dir: &Path, target: &Path) -> io::Result<()> {
        if self.create_missing_dirs {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !self.overwrite && tokio::fs::try_exists(target).await? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
        }
        tokio::fs::copy(source, target).await?;
        Ok(())
    }
}
