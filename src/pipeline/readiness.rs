//! File readiness detection.
//!
//! A file is ready when it can be opened for read/write and locked
//! exclusively. The probe releases the lock immediately; the gate never
//! holds the file open.
//!
//! Outside Windows a writer does not have to hold a lock while it writes,
//! so the gate also requires the file's [`Fingerprint`] to be unchanged
//! between two consecutive polls. A writer pausing for longer than the poll
//! interval is indistinguishable from a finished one.

use std::fs::{File, Metadata, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use fs2::FileExt;
use tokio_util::sync::CancellationToken;

use super::PipelineError;

/// Whether an exclusive lock alone proves the writer is done.
const LOCK_IS_EXCLUSIVE: bool = cfg!(windows);

/// Size and modification time of a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    /// `None` for anything that is not a regular file.
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        if !metadata.is_file() {
            return None;
        }
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    /// Fingerprint `path`, or `None` when it is missing or not a file.
    pub async fn read(path: &Path) -> Option<Self> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        Self::from_metadata(&metadata)
    }

    pub fn size(&self) -> u64 {
        self.len
    }
}

/// Result of a single readiness probe.
#[derive(Debug)]
pub enum Readiness {
    /// Exclusively lockable right now.
    Ready,
    /// Another writer still holds the file.
    Locked,
    /// Cannot be accessed at all; not worth retrying.
    Unavailable(io::Error),
}

/// Probe a file once.
pub fn probe(path: &Path) -> Readiness {
    let file = match open_exclusive(path) {
        Ok(file) => file,
        Err(e) if is_lock_contention(&e) => return Readiness::Locked,
        Err(e) => return Readiness::Unavailable(e),
    };

    // Fully qualified: std's inherent File::try_lock_exclusive has another signature
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            Readiness::Ready
        }
        Err(e) if is_lock_contention(&e) => Readiness::Locked,
        Err(e) => Readiness::Unavailable(e),
    }
}

#[cfg(windows)]
fn open_exclusive(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(0)
        .open(path)
}

#[cfg(not(windows))]
fn open_exclusive(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

fn is_lock_contention(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    let contended = fs2::lock_contended_error().raw_os_error();
    if contended.is_some() && error.raw_os_error() == contended {
        return true;
    }
    is_sharing_violation(error)
}

#[cfg(windows)]
fn is_sharing_violation(error: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(error.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_sharing_violation(_error: &io::Error) -> bool {
    false
}

/// Polls a file at a fixed interval until it is ready.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    interval: Duration,
    timeout: Option<Duration>,
}

impl ReadinessGate {
    /// `timeout = None` waits for as long as the file stays locked.
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    /// Wait until `path` is ready. Returns the number of locked probes seen.
    ///
    /// Cancellation is observed between probes; nothing about the file has
    /// changed at that point.
    pub async fn wait(
        &self,
        path: &Path,
        shutdown: &CancellationToken,
    ) -> Result<u32, PipelineError> {
        let started = Instant::now();
        let mut locked_probes = 0u32;
        let mut last_seen: Option<Fingerprint> = None;

        loop {
            let (readiness, fingerprint) = inspect(path).await;
            match readiness {
                Readiness::Ready => {
                    if LOCK_IS_EXCLUSIVE || (fingerprint.is_some() && fingerprint == last_seen) {
                        return Ok(locked_probes);
                    }
                    crate::debug_event!(
                        "readiness",
                        "settling",
                        "{} ({} bytes)",
                        path.display(),
                        fingerprint.map_or(0, |f| f.size())
                    );
                }
                Readiness::Unavailable(source) => {
                    return Err(PipelineError::Inaccessible {
                        path: path.to_path_buf(),
                        source,
                    });
                }
                Readiness::Locked => {
                    locked_probes += 1;
                    if locked_probes == 1 {
                        crate::log_event!("readiness", "locked, waiting", "{}", path.display());
                    } else {
                        crate::debug_event!(
                            "readiness",
                            "still locked",
                            "{} (probe {locked_probes})",
                            path.display()
                        );
                    }
                }
            }
            // Kept across locked polls so a released, unchanged file is
            // claimed on the next poll
            last_seen = fingerprint;

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    return Err(PipelineError::ReadinessTimeout {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Check the lock and fingerprint `path` off the async runtime.
async fn inspect(path: &Path) -> (Readiness, Option<Fingerprint>) {
    let owned = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let readiness = probe(&owned);
        let fingerprint = std::fs::metadata(&owned)
            .ok()
            .and_then(|metadata| Fingerprint::from_metadata(&metadata));
        (readiness, fingerprint)
    })
    .await;

    result.unwrap_or_else(|e| (Readiness::Unavailable(io::Error::other(e)), None))
}
