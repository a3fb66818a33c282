//! Directory resolution and validation.
//!
//! Turns up to four optional command-line paths into an immutable
//! [`WatchConfig`]. Relative paths resolve against the working directory,
//! omitted ones fall back to the conventional layout under the inbox.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default output directory name inside the inbox.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Default copy directory name inside the inbox.
pub const DEFAULT_COPY_DIR: &str = "copy";

/// Startup-only, process-fatal configuration errors.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{role} directory does not exist: {}", .path.display())]
    MissingDirectory { role: DirRole, path: PathBuf },

    #[error("{first} and {second} directories are the same: {}", .path.display())]
    DuplicateDirectory {
        first: DirRole,
        second: DirRole,
        path: PathBuf,
    },

    #[error("Cannot determine working directory: {0}")]
    WorkingDirectory(#[source] io::Error),
}

/// Which configured directory an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirRole {
    Input,
    Output,
    Copy,
    Archive,
}

impl std::fmt::Display for DirRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DirRole::Input => "Input",
            DirRole::Output => "Output",
            DirRole::Copy => "Copy",
            DirRole::Archive => "Archive",
        };
        f.write_str(name)
    }
}

/// Raw, unresolved directory arguments in positional order.
#[derive(Debug, Clone, Default)]
pub struct PathArgs {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub copy: Option<PathBuf>,
    pub archive: Option<PathBuf>,
}

/// Resolved, validated directory set shared by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    input_dir: PathBuf,
    output_dir: PathBuf,
    copy_dir: PathBuf,
    archive_dir: Option<PathBuf>,
}

impl WatchConfig {
    /// Resolve against the process working directory.
    pub fn resolve(args: PathArgs) -> Result<Self, ConfigurationError> {
        let cwd = std::env::current_dir().map_err(ConfigurationError::WorkingDirectory)?;
        Self::resolve_in(args, &cwd)
    }

    /// Resolve against an explicit base directory.
    ///
    /// Input and output must exist. Copy and archive only need to resolve;
    /// relocation creates them on demand.
    pub fn resolve_in(args: PathArgs, base: &Path) -> Result<Self, ConfigurationError> {
        let input_dir = match args.input {
            Some(path) => absolutize(base, &path),
            None => normalize(base),
        };
        let output_dir = args
            .output
            .map(|p| absolutize(base, &p))
            .unwrap_or_else(|| input_dir.join(DEFAULT_OUTPUT_DIR));
        let copy_dir = args
            .copy
            .map(|p| absolutize(base, &p))
            .unwrap_or_else(|| input_dir.join(DEFAULT_COPY_DIR));
        let archive_dir = args.archive.map(|p| absolutize(base, &p));

        let config = Self {
            input_dir,
            output_dir,
            copy_dir,
            archive_dir,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for (role, dir) in [
            (DirRole::Input, &self.input_dir),
            (DirRole::Output, &self.output_dir),
        ] {
            if !dir.is_dir() {
                return Err(ConfigurationError::MissingDirectory {
                    role,
                    path: dir.clone(),
                });
            }
        }

        let dirs = self.directories();
        for (i, (first, a)) in dirs.iter().enumerate() {
            for (second, b) in &dirs[i + 1..] {
                if a == b {
                    return Err(ConfigurationError::DuplicateDirectory {
                        first: *first,
                        second: *second,
                        path: a.to_path_buf(),
                    });
                }
            }
        }

        Ok(())
    }

    /// All configured directories with their roles.
    pub fn directories(&self) -> Vec<(DirRole, &Path)> {
        let mut dirs = vec![
            (DirRole::Input, self.input_dir.as_path()),
            (DirRole::Output, self.output_dir.as_path()),
            (DirRole::Copy, self.copy_dir.as_path()),
        ];
        if let Some(archive) = &self.archive_dir {
            dirs.push((DirRole::Archive, archive.as_path()));
        }
        dirs
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn copy_dir(&self) -> &Path {
        &self.copy_dir
    }

    pub fn archive_dir(&self) -> Option<&Path> {
        self.archive_dir.as_deref()
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically collapse `.` and `..` so equal directories compare equal.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
