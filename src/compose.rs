//! Sequential two-phase application of the source trees.
//!
//! The composer walks the common tree and links every file, then does the
//! same for the override tree. Because the override phase starts only after
//! the common phase has fully finished, and linking is last-writer-wins, a
//! path present in both trees always ends up pointing at the override
//! source. That ordering *is* the precedence mechanism; there is no merge or
//! diff step, and the two phases must never be reordered or interleaved.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::layout::{SourceTree, TreeRole};
use crate::logging::Log;
use crate::resources::symlink::LinkResource;
use crate::resources::{Applicable as _, Resource as _, ResourceChange};
use crate::walker;

/// Per-tree outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Links created or retargeted (in a dry run: links that would change).
    pub linked: u32,
    /// Destinations that already pointed at the wanted source.
    pub unchanged: u32,
}

/// A single destination that could not be linked.
///
/// Carries enough to diagnose the failure without re-running verbosely.
#[derive(Debug)]
pub struct FileError {
    /// Path relative to the tree and destination roots.
    pub relative: PathBuf,
    /// Absolute source path that was being linked.
    pub source: PathBuf,
    /// Absolute destination path that failed.
    pub destination: PathBuf,
    /// Underlying cause chain.
    pub cause: anyhow::Error,
}

/// Aggregate outcome of a run.
///
/// Every discovered file is attempted; failures accumulate here instead of
/// aborting the run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Counts for the common-tree phase.
    pub common: TreeStats,
    /// Counts for the override-tree phase.
    pub overlay: TreeStats,
    /// Per-file failures, in discovery order.
    pub errors: Vec<FileError>,
}

impl RunResult {
    /// `true` when no file failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total links created or retargeted across both phases.
    #[must_use]
    pub const fn total_linked(&self) -> u32 {
        self.common.linked + self.overlay.linked
    }
}

/// Drives the two-phase composition over a destination root.
pub struct Composer<'a> {
    destination: PathBuf,
    log: &'a dyn Log,
    dry_run: bool,
    cancel: &'a AtomicBool,
}

impl std::fmt::Debug for Composer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("destination", &self.destination)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl<'a> Composer<'a> {
    /// Create a composer for the given destination root.
    ///
    /// `cancel` is polled between file operations only, so an interrupt never
    /// interrupts a backup copy midway.
    #[must_use]
    pub fn new(
        destination: PathBuf,
        log: &'a dyn Log,
        dry_run: bool,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            destination,
            log,
            dry_run,
            cancel,
        }
    }

    /// Apply the common tree, then the override tree, onto the destination.
    ///
    /// The common phase completes fully before the override phase begins.
    /// A missing override tree is reported with a warning and contributes
    /// nothing; a missing common tree is an informational notice. Per-file
    /// failures are recorded in the result and do not stop the run.
    #[must_use]
    pub fn compose(&self, common: &SourceTree, overlay: &SourceTree) -> RunResult {
        let mut result = RunResult::default();
        let mut errors = Vec::new();
        self.apply_tree(common, &mut result.common, &mut errors);
        self.apply_tree(overlay, &mut result.overlay, &mut errors);
        result.errors = errors;
        result
    }

    /// Link every file of one tree into the destination root.
    fn apply_tree(&self, tree: &SourceTree, stats: &mut TreeStats, errors: &mut Vec<FileError>) {
        if !tree.root.is_dir() {
            match tree.role {
                TreeRole::Common => self.log.info(&format!(
                    "no common tree at {}, nothing to link from it",
                    tree.root.display()
                )),
                TreeRole::Override => self.log.warn(&format!(
                    "no override tree for host '{}' at {}, applying common files only",
                    overlay_name(&tree.root),
                    tree.root.display()
                )),
            }
            return;
        }

        if self.cancel.load(Ordering::SeqCst) {
            self.log
                .debug(&format!("skipping {} tree: interrupted", tree.role.as_str()));
            return;
        }

        let files = match walker::walk(&tree.root) {
            Ok(files) => files,
            Err(e) => {
                self.log
                    .error(&format!("walk {} tree: {e:#}", tree.role.as_str()));
                errors.push(FileError {
                    relative: PathBuf::from("."),
                    source: tree.root.clone(),
                    destination: self.destination.clone(),
                    cause: e,
                });
                return;
            }
        };
        self.log.info(&format!(
            "{}: {} file(s) discovered",
            tree.role.as_str(),
            files.len()
        ));

        for relative in files {
            if self.cancel.load(Ordering::SeqCst) {
                self.log.warn(&format!(
                    "interrupted, skipping remaining {} files",
                    tree.role.as_str()
                ));
                break;
            }

            let source = tree.root.join(&relative);
            let destination = self.destination.join(&relative);
            let resource = LinkResource::new(source.clone(), destination.clone());

            match resource.needs_change() {
                Ok(false) => {
                    self.log
                        .debug(&format!("ok: {} (already linked)", destination.display()));
                    stats.unchanged += 1;
                    continue;
                }
                Ok(true) => {}
                Err(e) => {
                    self.log
                        .error(&format!("inspect {}: {e:#}", destination.display()));
                    errors.push(FileError {
                        relative,
                        source,
                        destination,
                        cause: e,
                    });
                    continue;
                }
            }

            if self.dry_run {
                self.log.dry_run(&format!(
                    "would link {} -> {}",
                    destination.display(),
                    source.display()
                ));
                stats.linked += 1;
                continue;
            }

            match resource.apply(self.log) {
                Ok(ResourceChange::Applied) => {
                    self.log.success(&format!(
                        "linked {} -> {}",
                        destination.display(),
                        source.display()
                    ));
                    stats.linked += 1;
                }
                Ok(ResourceChange::AlreadyCorrect) => {
                    stats.unchanged += 1;
                }
                Err(e) => {
                    self.log.error(&format!(
                        "link {} -> {}: {e:#}",
                        destination.display(),
                        source.display()
                    ));
                    errors.push(FileError {
                        relative,
                        source,
                        destination,
                        cause: e,
                    });
                }
            }
        }
    }
}

/// The overlay identifier implied by an override-tree path (its last
/// component), for warning messages.
fn overlay_name(root: &Path) -> String {
    root.file_name()
        .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Captures warn/error messages so tests can assert on emitted events.
    #[derive(Debug, Default)]
    struct RecordingLog {
        warnings: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingLog {
        fn warnings(&self) -> Vec<String> {
            self.warnings.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, _msg: &str) {}
        fn info(&self, _msg: &str) {}
        fn success(&self, _msg: &str) {}
        fn debug(&self, _msg: &str) {}
        fn warn(&self, msg: &str) {
            self.warnings.lock().unwrap().push(msg.to_string());
        }
        fn error(&self, msg: &str) {
            self.errors.lock().unwrap().push(msg.to_string());
        }
        fn dry_run(&self, _msg: &str) {}
    }

    fn tree(root: &Path, role: TreeRole) -> SourceTree {
        SourceTree::new(root.to_path_buf(), role)
    }

    #[cfg(unix)]
    #[test]
    fn links_files_from_both_trees() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let common = repo.path().join("common");
        let hosts = repo.path().join("hosts/box");
        std::fs::create_dir_all(&common).unwrap();
        std::fs::create_dir_all(&hosts).unwrap();
        std::fs::write(common.join("a.conf"), "a").unwrap();
        std::fs::write(hosts.join("b.conf"), "b").unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(dest.path().to_path_buf(), &log, false, &cancel);
        let result = composer.compose(
            &tree(&common, TreeRole::Common),
            &tree(&hosts, TreeRole::Override),
        );

        assert!(result.is_clean());
        assert_eq!(result.common.linked, 1);
        assert_eq!(result.overlay.linked, 1);
        assert_eq!(
            std::fs::read_link(dest.path().join("a.conf")).unwrap(),
            common.join("a.conf")
        );
        assert_eq!(
            std::fs::read_link(dest.path().join("b.conf")).unwrap(),
            hosts.join("b.conf")
        );
    }

    #[test]
    fn missing_override_tree_warns_and_continues() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let common = repo.path().join("common");
        std::fs::create_dir_all(&common).unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(dest.path().to_path_buf(), &log, false, &cancel);
        let result = composer.compose(
            &tree(&common, TreeRole::Common),
            &tree(&repo.path().join("hosts/ghost"), TreeRole::Override),
        );

        assert!(result.is_clean());
        let warnings = log.warnings();
        assert_eq!(warnings.len(), 1, "exactly one warning: {warnings:?}");
        assert!(warnings[0].contains("ghost"), "names the overlay id");
    }

    #[test]
    fn missing_common_tree_is_not_a_warning() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let hosts = repo.path().join("hosts/box");
        std::fs::create_dir_all(&hosts).unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(dest.path().to_path_buf(), &log, false, &cancel);
        let result = composer.compose(
            &tree(&repo.path().join("common"), TreeRole::Common),
            &tree(&hosts, TreeRole::Override),
        );

        assert!(result.is_clean());
        assert!(log.warnings().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn dry_run_touches_nothing() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let common = repo.path().join("common");
        std::fs::create_dir_all(&common).unwrap();
        std::fs::write(common.join("a.conf"), "a").unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(dest.path().to_path_buf(), &log, true, &cancel);
        let result = composer.compose(
            &tree(&common, TreeRole::Common),
            &tree(&repo.path().join("hosts/x"), TreeRole::Override),
        );

        assert_eq!(result.common.linked, 1, "reported as would-change");
        assert!(
            !dest.path().join("a.conf").exists(),
            "dry run must not create links"
        );
    }

    #[cfg(unix)]
    #[test]
    fn pre_set_cancel_flag_skips_all_files() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let common = repo.path().join("common");
        std::fs::create_dir_all(&common).unwrap();
        std::fs::write(common.join("a.conf"), "a").unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(true);
        let composer = Composer::new(dest.path().to_path_buf(), &log, false, &cancel);
        let result = composer.compose(
            &tree(&common, TreeRole::Common),
            &tree(&repo.path().join("hosts/x"), TreeRole::Override),
        );

        assert_eq!(result.total_linked(), 0);
        assert!(!dest.path().join("a.conf").exists());
    }

    #[cfg(unix)]
    #[test]
    fn per_file_failure_does_not_stop_the_run() {
        let repo = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let common = repo.path().join("common");
        std::fs::create_dir_all(common.join("blocked")).unwrap();
        std::fs::write(common.join("blocked/a.conf"), "a").unwrap();
        std::fs::write(common.join("ok.conf"), "ok").unwrap();
        // Occupy the parent path of blocked/a.conf with a regular file so
        // create_dir_all fails for that destination only.
        std::fs::write(dest.path().join("blocked"), "not a dir").unwrap();

        let log = RecordingLog::default();
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(dest.path().to_path_buf(), &log, false, &cancel);
        let result = composer.compose(
            &tree(&common, TreeRole::Common),
            &tree(&repo.path().join("hosts/x"), TreeRole::Override),
        );

        assert_eq!(result.errors.len(), 1, "exactly one error");
        assert_eq!(result.errors[0].relative, PathBuf::from("blocked/a.conf"));
        assert_eq!(result.common.linked, 1, "the other file still linked");
        assert!(dest.path().join("ok.conf").symlink_metadata().is_ok());
        assert_eq!(log.errors().len(), 1);
    }
}
