//! Shared types and utilities for rusty-drive.
//!
//! This crate provides common functionality used across all rusty-drive crates:
//! - Transfer and pagination defaults
//! - Generic progress callback trait

pub mod constants;
pub mod progress;

// Re-export commonly used items at crate root
pub use constants::*;
pub use progress::{progress_fn, FnProgress, ProgressCallback};
