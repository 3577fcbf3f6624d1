//! Error types for the archives library
//!
//! This module defines all error types that can occur while walking files on
//! disk, resolving symbolic links, and reading or writing archive containers.
//! Errors carry the offending path, hop count or limit so that callers can act
//! on them without re-deriving context.
//!
//! ## Categories
//!
//! - **Path errors**: malformed path arguments, surfaced immediately
//! - **Symlink errors**: loops, depth overflow and broken links
//! - **I/O errors**: from the filesystem or the source/destination stream,
//!   propagated unchanged
//! - **Handler errors**: returned by extraction callbacks, handed back to the
//!   extraction caller untouched
//! - **Cancellation**: the caller asked to stop; kept distinct from failures

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the archives library
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Main error type for all archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O errors during file or stream operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the zip container codec
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// The operation was cancelled through its [`Context`](crate::Context)
    #[error("Operation cancelled")]
    Cancelled,

    /// A symbolic link chain revisits a path it already passed through
    #[error("symlink loop detected: {path:?}")]
    SymlinkLoop {
        /// Path at which the loop closed
        path: PathBuf,
    },

    /// A symbolic link chain is longer than the resolver allows
    #[error("maximum symlink depth ({limit}) exceeded while resolving {path:?}")]
    SymlinkDepthExceeded {
        /// Link the resolution started from
        path: PathBuf,
        /// Configured hop limit
        limit: usize,
    },

    /// The final target of a symbolic link could not be stat'd
    #[error("statting dereferenced symlink {path:?}: {source}")]
    DereferenceStat {
        /// Target path that failed to stat
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A symbolic link could not be read
    #[error("reading symlink {path:?}: {source}")]
    ReadLink {
        /// Link that failed to read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed path argument
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not valid UTF-8 and cannot become an archive name
    #[error("Path conversion error: {0:?}")]
    PathConversion(std::ffi::OsString),

    /// Content was requested from an entry that is not a regular file
    #[error("Entry is not a regular file: {name}")]
    NotAFile {
        /// Name of the entry in the archive
        name: String,
    },

    /// Symlink target stored in a container is unusable
    #[error("Invalid symlink target for entry: {name}")]
    InvalidLinkTarget {
        /// Name of the entry in the archive
        name: String,
    },

    /// Error produced by a caller-supplied entry handler
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    /// Wrap an arbitrary error raised inside an entry handler
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ArchiveError::Handler(err.into())
    }

    /// Create an invalid path error with a custom message
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        ArchiveError::InvalidPath(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        ArchiveError::Internal(msg.into())
    }

    /// Check if this error means the caller asked to stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ArchiveError::Cancelled)
    }

    /// Check if this error came out of symlink resolution
    pub fn is_symlink_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::SymlinkLoop { .. }
                | ArchiveError::SymlinkDepthExceeded { .. }
                | ArchiveError::DereferenceStat { .. }
                | ArchiveError::ReadLink { .. }
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            ArchiveError::SymlinkLoop { path } => {
                format!(
                    "Symbolic link loop at {:?}. Archive without --follow-symlinks to store links as-is.",
                    path
                )
            }
            ArchiveError::SymlinkDepthExceeded { path, limit } => {
                format!(
                    "Symbolic link chain starting at {:?} is longer than {} hops.",
                    path, limit
                )
            }
            ArchiveError::DereferenceStat { path, .. } => {
                format!(
                    "Symbolic link points to {:?}, which does not exist. Remove the broken link or archive without --follow-symlinks.",
                    path
                )
            }
            ArchiveError::Cancelled => "Operation cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}
