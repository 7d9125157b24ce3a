//! Run-level error taxonomy.
//!
//! Only these reach the top level. Upstream fetch failures never do: the
//! source adapter downgrades them to "no more data from this strategy".

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Missing credentials or invalid settings. Raised before the ledger is read.
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger or feed could not be read/written. Nothing is considered committed.
    #[error("persistence error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another run holds the ledger lock.
    #[error("another run holds the ledger lock at {}", .0.display())]
    Busy(PathBuf),

    /// The serializer failed to render the window.
    #[error("rendering feed failed: {0}")]
    Render(String),
}

impl RunError {
    pub fn config(msg: impl Into<String>) -> Self {
        RunError::Config(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RunError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) => 2,
            RunError::Persistence { .. } => 3,
            RunError::Busy(_) => 4,
            RunError::Render(_) => 5,
        }
    }
}

pub type RunResult<T> = std::result::Result<T, RunError>;
