//! Domain-specific error types for the homelink engine.
//!
//! This module provides structured error types using [`thiserror`].
//! Internal modules return typed errors ([`LayoutError`], [`BackupError`])
//! while resource code and command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise while resolving the repository layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// No repository root could be determined from flags, env, or binary location.
    #[error("cannot determine repository root. Use --root or set HOMELINK_ROOT")]
    RootNotFound,

    /// The home directory is not discoverable from the environment.
    #[error("neither HOME nor USERPROFILE environment variable is set")]
    HomeNotSet,
}

/// Errors that arise while preserving a destination before replacement.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The computed backup path is already occupied.
    ///
    /// Happens when the tool is re-run against the same real-file destination
    /// within the same second. Surfaced per file rather than guessing between
    /// overwrite and skip.
    #[error("backup target already exists: {}", .backup.display())]
    TargetExists {
        /// Path the backup would have been written to.
        backup: PathBuf,
    },

    /// The copy step failed; the original is left untouched.
    #[error("copy {} to {}: {cause:#}", .path.display(), .backup.display())]
    Copy {
        /// Path being preserved.
        path: PathBuf,
        /// Backup path the copy was writing to.
        backup: PathBuf,
        /// Underlying failure.
        cause: anyhow::Error,
    },

    /// The original could not be removed after a completed copy.
    #[error("remove original {} after backup: {source}", .path.display())]
    Remove {
        /// Path being preserved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The destination's metadata could not be read.
    #[error("inspect {}: {source}", .path.display())]
    Inspect {
        /// Path being inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
