//! Advisory lock guarding read-modify-write of the master result set

use crate::storage::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive OS lock on a sibling `<name>.lock` file
///
/// The lock file itself is left in place; only the lock on it matters. The OS
/// drops the lock when the holder exits, so a crashed crawler never leaves the
/// master set locked.
#[derive(Debug)]
pub struct MasterLock {
    path: PathBuf,
    file: File,
}

impl MasterLock {
    /// Acquires the lock for `target`, polling until `timeout` elapses
    ///
    /// Blocks the calling thread while waiting.
    pub fn acquire(target: &Path, timeout: Duration) -> StorageResult<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if is_contended(&e) => {
                    if start.elapsed() >= timeout {
                        return Err(StorageError::LockTimeout {
                            path,
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Owner pid is informational only.
        if file.set_len(0).is_ok() {
            let _ = writeln!(file, "{}", std::process::id());
        }
        tracing::trace!("Acquired lock {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MasterLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
