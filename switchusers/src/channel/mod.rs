//! Channel layer for pattern matching and PTY operations.
//!
//! This module handles the interactive shell stream: ANSI stripping,
//! tail-search prompt detection and bounded reads.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel};
