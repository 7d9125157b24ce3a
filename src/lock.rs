//! Advisory single-flight lock for the ledger.
//!
//! An exclusive `flock(LOCK_EX | LOCK_NB)` is taken on `<ledger>.lock` and held
//! on the open file for the whole run. The kernel drops it when the file is
//! closed or the process dies, so a crashed run never leaves a live lock
//! behind. The file itself stays on disk; only the flock matters.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    // flock lives as long as this descriptor
    _file: File,
}

#[derive(Debug, Error)]
pub enum LockError {
    /// Another live run holds the lock.
    #[error("run lock {} is held by another process", .0.display())]
    Held(PathBuf),

    #[error("run lock i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Lock path for a ledger file: same directory, `.lock` appended.
pub fn lock_path_for(ledger: &Path) -> PathBuf {
    let mut name = ledger
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    ledger.with_file_name(name)
}

impl RunLock {
    /// Take the lock without waiting. `Held` if another process (or another
    /// open handle in this one) already has it.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if !try_flock_exclusive(&file)? {
            return Err(LockError::Held(path.to_path_buf()));
        }

        // Holder info for humans; the flock is the actual lock.
        file.set_len(0)?;
        writeln!(file, "pid={}", std::process::id())?;

        tracing::debug!(path = %path.display(), "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Non-blocking exclusive flock. `Ok(false)` when someone else holds it.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fd is a valid descriptor owned by `file` for this call.
        #[allow(unsafe_code)]
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}
