//! Symlink resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::logging::Log;

use super::{Applicable, Resource, ResourceChange, ResourceState, backup};

/// A symlink resource that can be checked and applied.
#[derive(Debug, Clone)]
pub struct LinkResource {
    /// The source file (what the symlink points to).
    pub source: PathBuf,
    /// The destination path (where the symlink will be created).
    pub destination: PathBuf,
}

impl LinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl Applicable for LinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.destination.display(), self.source.display())
    }

    /// Link `destination` to `source`, preserving real pre-existing content.
    ///
    /// Always ends with `destination` pointing at `source`, regardless of what
    /// was there before (last-writer-wins). Real files and directories are
    /// backed up first; an existing symlink is replaced without a backup.
    fn apply(&self, log: &dyn Log) -> Result<ResourceChange> {
        super::fs::ensure_parent_dir(&self.destination)?;

        backup::preserve(&self.destination, log)
            .with_context(|| format!("preserve existing: {}", self.destination.display()))?;

        replace_symlink(&self.source, &self.destination)
            .with_context(|| format!("create link: {}", self.destination.display()))?;

        Ok(ResourceChange::Applied)
    }
}

impl Resource for LinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        std::fs::read_link(&self.destination).map_or_else(
            |_| {
                // Destination isn't a symlink; distinguish absent from real.
                match self.destination.symlink_metadata() {
                    Ok(meta) if meta.is_dir() => Ok(ResourceState::Incorrect {
                        current: "destination is a real directory".to_string(),
                    }),
                    Ok(_) => Ok(ResourceState::Incorrect {
                        current: "destination is a regular file".to_string(),
                    }),
                    Err(_) => Ok(ResourceState::Missing),
                }
            },
            |existing| {
                if paths_equal(&existing, &self.source) {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        current: format!("points to {}", existing.display()),
                    })
                }
            },
        )
    }
}

/// Compare two paths for equality, handling UNC prefix normalization on Windows.
fn paths_equal(a: &Path, b: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        #[cfg(windows)]
        {
            let s = p.to_string_lossy();
            if let Some(stripped) = s.strip_prefix(r"\\?\") {
                return PathBuf::from(stripped);
            }
        }
        p.to_path_buf()
    };

    normalize(a) == normalize(b)
}

/// Point `destination` at `source`, replacing whatever symlink may be there.
///
/// On Unix the new link is staged at a sibling temp path and renamed over the
/// destination, so no moment exists where the destination is absent.  On
/// Windows a rename cannot replace an existing link, so the old link is
/// removed first; the gap between removal and re-creation is the platform's
/// best effort.
fn replace_symlink(source: &Path, destination: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let tmp = destination.with_extension("homelink_tmp");
        // A stale temp link can survive a crashed run.
        super::fs::remove_existing(&tmp)?;
        std::os::unix::fs::symlink(source, &tmp).with_context(|| {
            format!("creating symlink {} -> {}", tmp.display(), source.display())
        })?;
        if let Err(e) = std::fs::rename(&tmp, destination) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| {
                format!("rename {} to {}", tmp.display(), destination.display())
            });
        }
    }

    #[cfg(windows)]
    {
        if destination.symlink_metadata().is_ok() {
            remove_symlink(destination)
                .with_context(|| format!("remove existing: {}", destination.display()))?;
        }
        let result = if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, destination)
        } else {
            std::os::windows::fs::symlink_file(source, destination)
        };
        match result {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(5) => {
                create_symlink_fallback(source, destination)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Remove a symlink, handling platform differences.
///
/// On Windows, directory symlinks must be removed with `remove_dir` (not
/// `remove_file`).  Rust's `symlink_metadata().is_dir()` returns `false` for
/// symlinks, so we check the raw `FILE_ATTRIBUTE_DIRECTORY` flag to detect
/// directory symlinks.
#[cfg(windows)]
fn remove_symlink(path: &Path) -> Result<()> {
    use std::os::windows::fs::MetadataExt;
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if meta.file_attributes() & 0x10 != 0 {
        std::fs::remove_dir(path)
            .with_context(|| format!("removing directory link: {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing file: {}", path.display()))?;
    }
    Ok(())
}

/// Fallback for Windows when symlinks are not permitted.
/// Uses junctions for directories and hard links for files.
#[cfg(windows)]
fn create_symlink_fallback(source: &Path, destination: &Path) -> Result<()> {
    if source.is_dir() {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        let output = std::process::Command::new("cmd")
            .arg("/c")
            .arg(format!(
                "mklink /J \"{}\" \"{}\"",
                destination.display(),
                source.display()
            ))
            .creation_flags(CREATE_NO_WINDOW)
            .output()
            .context("failed to run mklink /J")?;
        if !output.status.success() {
            anyhow::bail!(
                "Cannot create symlink or junction for '{}'.\n\
                 Enable Developer Mode (Settings > System > For developers) \
                 or run as Administrator.\n\
                 mklink error: {}",
                destination.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
    } else {
        std::fs::hard_link(source, destination).with_context(|| {
            format!(
                "Cannot create symlink or hard link for '{}'.\n\
                 Enable Developer Mode (Settings > System > For developers) \
                 or run as Administrator.",
                destination.display()
            )
        })?;
    }
    Ok(())
}
