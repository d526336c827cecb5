//! Source-tree enumeration.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use walkdir::WalkDir;

/// Enumerate the regular files of a source tree as tree-relative paths.
///
/// Directories are traversed but not yielded. Symlinks under the tree are
/// not dereferenced; they are yielded by path like any other leaf file, so a
/// link inside a source tree is itself linkable. A missing `tree_root` yields
/// an empty list rather than an error — absence of a tree is a legitimate
/// state the caller reports.
///
/// Entries are sorted by file name at every directory level, so the result is
/// deterministic for a given filesystem snapshot.
///
/// # Errors
///
/// Returns an error if a directory under an existing `tree_root` cannot be
/// read.
pub fn walk(tree_root: &Path) -> Result<Vec<PathBuf>> {
    if !tree_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(tree_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("reading tree {}", tree_root.display()))?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(tree_root)
            .with_context(|| format!("path escapes tree root: {}", entry.path().display()))?;
        files.push(relative.to_path_buf());
    }
    Ok(files)
}
