//! Preservation of real destination content before replacement.
//!
//! A destination about to receive a symlink may hold a real file or
//! directory the user cares about. That content is copied to a timestamped
//! `.bak` sibling before the original is removed; symlinks are never backed
//! up (they are simply relinked), which is what makes repeated runs produce
//! no new backup artifacts.

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::error::BackupError;
use crate::logging::Log;

use super::fs::copy_dir_recursive;

/// Ensure that any real content at `destination` is preserved before the
/// caller replaces it.
///
/// - Absent destination: no-op.
/// - Destination is a symlink (even a broken one): no-op.
/// - Destination is a real file or directory: copy it to
///   `<destination>.bak.<timestamp>`, then remove the original. The copy
///   always completes before the removal starts.
///
/// Returns the backup path when one was created.
///
/// # Errors
///
/// Returns an error if the destination cannot be inspected, if the backup
/// path is already occupied (two runs within the same second against the
/// same real destination), or if the copy or removal fails. A copy failure
/// leaves the original untouched.
pub fn preserve(destination: &Path, log: &dyn Log) -> Result<Option<PathBuf>, BackupError> {
    let meta = match destination.symlink_metadata() {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BackupError::Inspect {
                path: destination.to_path_buf(),
                source: e,
            });
        }
    };
    if meta.is_symlink() {
        return Ok(None);
    }

    let backup = backup_path(destination, &timestamp());
    preserve_as(destination, &backup, meta.is_dir())?;
    log.info(&format!(
        "preserved {} -> {}",
        destination.display(),
        backup.display()
    ));
    Ok(Some(backup))
}

/// Copy `destination` to `backup` and remove the original.
///
/// Split out from [`preserve`] so the backup path is an explicit input.
fn preserve_as(destination: &Path, backup: &Path, is_dir: bool) -> Result<(), BackupError> {
    if backup.symlink_metadata().is_ok() {
        return Err(BackupError::TargetExists {
            backup: backup.to_path_buf(),
        });
    }

    if is_dir {
        copy_dir_recursive(destination, backup).map_err(|e| BackupError::Copy {
            path: destination.to_path_buf(),
            backup: backup.to_path_buf(),
            cause: e,
        })?;
        std::fs::remove_dir_all(destination).map_err(|e| BackupError::Remove {
            path: destination.to_path_buf(),
            source: e,
        })?;
    } else {
        std::fs::copy(destination, backup).map_err(|e| BackupError::Copy {
            path: destination.to_path_buf(),
            backup: backup.to_path_buf(),
            cause: anyhow!(e),
        })?;
        std::fs::remove_file(destination).map_err(|e| BackupError::Remove {
            path: destination.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// The backup sibling for `destination` at the given timestamp.
fn backup_path(destination: &Path, timestamp: &str) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(format!(".bak.{timestamp}"));
    PathBuf::from(name)
}

/// Current local time in sortable second precision.
///
/// Two runs within the same second collide on the backup name; the collision
/// is surfaced as [`BackupError::TargetExists`] rather than resolved.
fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}
