//! The `link` command: resolve the layout, compose both trees, summarise.
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::compose::Composer;
use crate::layout::Layout;
use crate::logging::Logger;

/// Run the link command.
///
/// Attempts every discovered file; per-file failures are logged as they
/// happen and only surface at the end as a non-zero exit.
///
/// # Errors
///
/// Returns an error if the layout cannot be resolved, or if one or more
/// files failed to link (after every file has been attempted).
pub fn run(global: &GlobalOpts, log: &Logger, cancel: &AtomicBool) -> Result<()> {
    let version = option_env!("HOMELINK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("homelink {version}"));

    log.stage("Resolving layout");
    let layout = Layout::resolve(global)?;
    log.info(&format!("root: {}", layout.root.display()));
    log.info(&format!("host: {}", layout.overlay_id));
    log.info(&format!("target: {}", layout.destination.display()));

    log.stage(if global.dry_run {
        "Previewing links"
    } else {
        "Linking files"
    });
    let composer = Composer::new(layout.destination.clone(), log, global.dry_run, cancel);
    let result = composer.compose(&layout.common_tree(), &layout.override_tree());

    log.stage("Summary");
    let verb = if global.dry_run { "would link" } else { "linked" };
    log.info(&format!(
        "common: {} {verb}, {} unchanged",
        result.common.linked, result.common.unchanged
    ));
    log.info(&format!(
        "override: {} {verb}, {} unchanged",
        result.overlay.linked, result.overlay.unchanged
    ));
    if let Some(path) = log.log_path() {
        log.info(&format!("log: {}", path.display()));
    }

    if !result.is_clean() {
        anyhow::bail!("{} file(s) failed to link", result.errors.len());
    }
    Ok(())
}
