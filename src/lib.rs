//! Layered dotfile symlink engine.
//!
//! Projects two source trees — a `common/` tree shared by every machine and a
//! `hosts/<id>/` override tree selected by host identity — into a destination
//! root (normally `$HOME`) as symlinks. The override tree is applied strictly
//! after the common tree, so any path present in both ends up pointing at the
//! override source. Pre-existing real files and directories at a destination
//! are preserved to a timestamped `.bak` sibling before being replaced.
//!
//! The public API is organised into five layers:
//!
//! - **[`layout`]** — resolve the repo root, overlay identifier, and trees
//! - **[`walker`]** — enumerate the relative file paths of a source tree
//! - **[`resources`]** — idempotent `check + apply` symlink and backup primitives
//! - **[`compose`]** — sequential two-phase application over both trees
//! - **[`commands`]** — top-level subcommand orchestration (`link`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod compose;
pub mod error;
pub mod layout;
pub mod logging;
pub mod resources;
pub mod walker;
