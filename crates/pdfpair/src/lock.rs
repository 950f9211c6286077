//! Run-scoped lock on an output folder.
//!
//! Two runs writing into the same folder would interleave outputs, so each
//! run holds a lock file for as long as it writes. The file is created with
//! create-new semantics, holds the owner's pid, and is removed when the guard
//! drops. A lock left by a process that no longer exists is reclaimed; any
//! other existing lock is reported with the path of the file to delete.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PdfPairError, Result};

/// Name of the lock file inside the output folder.
pub const LOCK_FILE_NAME: &str = ".pdfpair.lock";

/// Guard that owns the lock file while alive.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    /// Take the lock on `dir`.
    ///
    /// # Errors
    ///
    /// [`PdfPairError::OutputLocked`] if another live run holds it, or an
    /// I/O error if the lock file cannot be written.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut reclaimed = false;

        let file = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if reclaimed || !is_stale(&path) {
                        return Err(PdfPairError::OutputLocked { lock_path: path });
                    }
                    warn!("removing stale lock {}", path.display());
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                        Err(err) => return Err(err.into()),
                    }
                    reclaimed = true;
                }
                Err(err) => return Err(err.into()),
            }
        };

        // The guard exists before the pid is written, so a failed write
        // still removes the file.
        let lock = Self { path };
        write_pid(file)?;
        debug!("acquired {}", lock.path.display());

        Ok(lock)
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_pid(mut file: File) -> io::Result<()> {
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()
}

/// Whether the lock at `path` names a process that has exited.
///
/// An empty or unreadable file may belong to a run that has not written its
/// pid yet, so only a parsable pid of a dead process counts as stale.
fn is_stale(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    match contents.trim().parse::<u32>() {
        Ok(pid) => !process_exists(pid),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn process_exists(pid: u32) -> bool {
    pid == std::process::id() || Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_exists(_pid: u32) -> bool {
    true
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!("failed to release {}: {}", self.path.display(), err);
        }
    }
}
