// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed source repository plus an isolated
// destination root, with a fluent builder so each integration test can set up
// its environment without repeating filesystem boilerplate, and a capturing
// logger so emitted events are assertable.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use homelink_cli::compose::{Composer, RunResult};
use homelink_cli::layout::{SourceTree, TreeRole};
use homelink_cli::logging::Log;

/// An isolated test environment: a repository with `common/` and `hosts/`
/// trees, and a separate destination root standing in for `$HOME`.
///
/// Both directories are deleted when dropped (via the underlying
/// [`tempfile::TempDir`]s).
pub struct TestRepo {
    /// Temporary directory containing the source repository.
    pub repo: tempfile::TempDir,
    /// Temporary directory the links are created under.
    pub dest: tempfile::TempDir,
    /// Overlay identifier the override tree is built for.
    pub host: String,
}

impl TestRepo {
    /// Create an environment with an empty `common/` tree for host `host`.
    pub fn new(host: &str) -> Self {
        let repo = tempfile::tempdir().expect("create repo temp dir");
        let dest = tempfile::tempdir().expect("create dest temp dir");
        std::fs::create_dir_all(repo.path().join("common")).expect("create common tree");
        Self {
            repo,
            dest,
            host: host.to_string(),
        }
    }

    /// Path to the destination root.
    pub fn dest_path(&self) -> &Path {
        self.dest.path()
    }

    /// Absolute path of a file under the common tree.
    pub fn common_file(&self, relative: &str) -> PathBuf {
        self.repo.path().join("common").join(relative)
    }

    /// Absolute path of a file under this host's override tree.
    pub fn host_file(&self, relative: &str) -> PathBuf {
        self.repo.path().join("hosts").join(&self.host).join(relative)
    }

    /// The common source tree.
    pub fn common_tree(&self) -> SourceTree {
        SourceTree::new(self.repo.path().join("common"), TreeRole::Common)
    }

    /// The override source tree for the configured host.
    pub fn override_tree(&self) -> SourceTree {
        SourceTree::new(
            self.repo.path().join("hosts").join(&self.host),
            TreeRole::Override,
        )
    }

    /// Run the composer over both trees and return the result.
    pub fn compose(&self, log: &dyn Log) -> RunResult {
        let cancel = AtomicBool::new(false);
        let composer = Composer::new(self.dest.path().to_path_buf(), log, false, &cancel);
        composer.compose(&self.common_tree(), &self.override_tree())
    }

    /// List the backup artifacts for `name` in the destination directory
    /// containing `relative` (e.g. `"a.conf"` matches `a.conf.bak.*`).
    pub fn backups_of(&self, relative: &str) -> Vec<PathBuf> {
        let full = self.dest.path().join(relative);
        let dir = full.parent().expect("destination has a parent");
        let name = full
            .file_name()
            .expect("destination has a file name")
            .to_string_lossy()
            .into_owned();
        let prefix = format!("{name}.bak.");
        std::fs::read_dir(dir)
            .expect("read destination dir")
            .map(|e| e.expect("read dir entry").path())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
            })
            .collect()
    }
}

/// Fluent builder for [`TestRepo`].
pub struct TestRepoBuilder {
    repo: TestRepo,
}

impl TestRepoBuilder {
    /// Begin building an environment for host `host`.
    pub fn new(host: &str) -> Self {
        Self {
            repo: TestRepo::new(host),
        }
    }

    /// Write `content` to `common/<relative>`, creating parents.
    pub fn with_common_file(self, relative: &str, content: &str) -> Self {
        let path = self.repo.common_file(relative);
        write_file(&path, content);
        self
    }

    /// Write `content` to `hosts/<host>/<relative>`, creating parents.
    pub fn with_host_file(self, relative: &str, content: &str) -> Self {
        let path = self.repo.host_file(relative);
        write_file(&path, content);
        self
    }

    /// Pre-populate the destination with a real file at `relative`.
    pub fn with_dest_file(self, relative: &str, content: &str) -> Self {
        let path = self.repo.dest.path().join(relative);
        write_file(&path, content);
        self
    }

    /// Pre-populate the destination with a symlink at `relative` pointing
    /// at `target`.
    #[cfg(unix)]
    pub fn with_dest_symlink(self, relative: &str, target: &Path) -> Self {
        let path = self.repo.dest.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dest parent");
        }
        std::os::unix::fs::symlink(target, &path).expect("create dest symlink");
        self
    }

    /// Finish building and return the configured environment.
    pub fn build(self) -> TestRepo {
        self.repo
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, content).expect("write file");
}

/// A [`Log`] implementation that captures every message per level, so tests
/// can assert on emitted events (e.g. exactly one warning for a missing
/// override tree).
#[derive(Debug, Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<(Level, String)>>,
}

/// Level tag for captured log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Stage,
    Info,
    Success,
    Debug,
    Warn,
    Error,
    DryRun,
}

impl RecordingLog {
    fn record(&self, level: Level, msg: &str) {
        self.entries
            .lock()
            .expect("entries lock")
            .push((level, msg.to_string()));
    }

    /// All captured messages at `level`, in emission order.
    pub fn at_level(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .expect("entries lock")
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Log for RecordingLog {
    fn stage(&self, msg: &str) {
        self.record(Level::Stage, msg);
    }
    fn info(&self, msg: &str) {
        self.record(Level::Info, msg);
    }
    fn success(&self, msg: &str) {
        self.record(Level::Success, msg);
    }
    fn debug(&self, msg: &str) {
        self.record(Level::Debug, msg);
    }
    fn warn(&self, msg: &str) {
        self.record(Level::Warn, msg);
    }
    fn error(&self, msg: &str) {
        self.record(Level::Error, msg);
    }
    fn dry_run(&self, msg: &str) {
        self.record(Level::DryRun, msg);
    }
}
