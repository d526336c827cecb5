//! The [`Log`] trait: the leveled sink the engine reports through.

/// Abstraction over logging backends.
///
/// The composer, link operation, and backup policy all take a `&dyn Log`
/// rather than reaching for ambient state, so tests can substitute a
/// capturing implementation and assert on emitted events.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message (discovery and skip notices).
    fn info(&self, msg: &str);
    /// Log a completed-action message (a link that was created).
    fn success(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message (e.g. a missing override tree).
    fn warn(&self, msg: &str);
    /// Log an error message (per-file failures).
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
}
