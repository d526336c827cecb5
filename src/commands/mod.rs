//! Top-level subcommand orchestration.
pub mod link;
