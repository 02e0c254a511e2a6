// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling `watch` / `exclude` glob patterns per trigger class.
//! - Wiring up a cross-platform filesystem watcher (`notify`) behind the
//!   [`WatchBackend`] trait.
//! - Finding the files a copy step operates on.
//!
//! It does **not** know about builders; it only turns filesystem changes
//! into named triggers.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{matching_triggers, TriggerFired};
pub use patterns::{build_file_globset, build_globset, collect_matching_files, rooted_pattern, TriggerProfile};
pub use watcher::{NotifyBackend, WatchBackend, WatchGuard};
