//! Repository layout resolution: repo root, overlay identifier, and trees.
//!
//! The engine consumes `<root>/common/` and `<root>/hosts/<overlayId>/` and
//! mirrors their relative paths under the destination root. Everything here
//! is resolved once at the start of a run and is immutable afterwards.

use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::error::LayoutError;

/// Directory under the repo root holding files shared by every host.
const COMMON_DIR: &str = "common";

/// Directory under the repo root holding per-host override trees.
const HOSTS_DIR: &str = "hosts";

/// Overlay identifier used when host identity cannot be determined.
const DEFAULT_OVERLAY_ID: &str = "default";

/// Logical role of a source tree in the two-layer composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRole {
    /// Applies to all hosts; processed first.
    Common,
    /// Host-specific; processed second, so it wins conflicts.
    Override,
}

impl TreeRole {
    /// Short lowercase name for log messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Override => "override",
        }
    }
}

/// A resolved source tree: a root directory plus its composition role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Absolute root directory of the tree. May not exist on disk.
    pub root: PathBuf,
    /// Role of the tree in the two-layer composition.
    pub role: TreeRole,
}

impl SourceTree {
    /// Create a new source tree.
    #[must_use]
    pub const fn new(root: PathBuf, role: TreeRole) -> Self {
        Self { root, role }
    }
}

/// The fully resolved layout of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Absolute root of the repository containing the source trees.
    pub root: PathBuf,
    /// Identifier selecting the override tree under `hosts/`.
    pub overlay_id: String,
    /// Root directory the symlinks are created under.
    pub destination: PathBuf,
}

impl Layout {
    /// Resolve the layout from CLI options and the environment.
    ///
    /// The repo root comes from `--root`, the `HOMELINK_ROOT` env var, the
    /// location of the running binary, or the current directory, in that
    /// order. The overlay identifier comes from `--host` or host-identity
    /// detection (which never fails — see [`detect_overlay_id`]). The
    /// destination comes from `--target` or the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no repo root candidate is usable, or if neither
    /// `HOME` nor `USERPROFILE` is set when `--target` is omitted.
    pub fn resolve(global: &GlobalOpts) -> Result<Self, LayoutError> {
        let root = resolve_root(global)?;
        let overlay_id = global
            .host
            .clone()
            .unwrap_or_else(|| detect_overlay_id(Path::new("/etc/hostname")));
        let destination = match &global.target {
            Some(target) => target.clone(),
            None => home_dir()?,
        };
        Ok(Self {
            root,
            overlay_id,
            destination,
        })
    }

    /// The `common/` source tree.
    #[must_use]
    pub fn common_tree(&self) -> SourceTree {
        SourceTree::new(self.root.join(COMMON_DIR), TreeRole::Common)
    }

    /// The `hosts/<overlayId>/` source tree.
    #[must_use]
    pub fn override_tree(&self) -> SourceTree {
        SourceTree::new(
            self.root.join(HOSTS_DIR).join(&self.overlay_id),
            TreeRole::Override,
        )
    }
}

/// Resolve the repository root directory from CLI arguments or auto-detection.
fn resolve_root(global: &GlobalOpts) -> Result<PathBuf, LayoutError> {
    if let Some(ref root) = global.root {
        return Ok(root.clone());
    }

    if let Ok(root) = std::env::var("HOMELINK_ROOT") {
        return Ok(PathBuf::from(root));
    }

    // Try to find the repository root from the current binary's location,
    // so invocation works regardless of the caller's working directory.
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("../../.."), // target/release/ → repo root
            parent.join(".."),       // bin/ → repo root
        ];
        for candidate in &candidates {
            if candidate.join(COMMON_DIR).is_dir()
                && let Ok(canonical) = std::fs::canonicalize(candidate)
            {
                return Ok(canonical);
            }
        }
    }

    // Last resort: current directory.
    if let Ok(cwd) = std::env::current_dir()
        && cwd.join(COMMON_DIR).is_dir()
    {
        return Ok(cwd);
    }

    Err(LayoutError::RootNotFound)
}

/// Detect the overlay identifier from host identity.
///
/// Reads `hostname_file` (normally `/etc/hostname`); if that is absent,
/// unreadable, or blank, falls back to the `HOSTNAME` (Unix) or
/// `COMPUTERNAME` (Windows) environment variable; if that too is unset,
/// returns `"default"`. Never fails.
#[must_use]
pub fn detect_overlay_id(hostname_file: &Path) -> String {
    if let Ok(contents) = std::fs::read_to_string(hostname_file) {
        let name = contents.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let env_var = if cfg!(windows) { "COMPUTERNAME" } else { "HOSTNAME" };
    if let Ok(name) = std::env::var(env_var) {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }

    DEFAULT_OVERLAY_ID.to_string()
}

/// The user's home directory from the environment.
fn home_dir() -> Result<PathBuf, LayoutError> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE").or_else(|_| std::env::var("HOME"))
    } else {
        std::env::var("HOME")
    };
    home.map(PathBuf::from).map_err(|_| LayoutError::HomeNotSet)
}
