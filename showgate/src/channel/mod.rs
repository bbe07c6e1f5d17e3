//! Channel layer for prompt matching and PTY operations.
//!
//! This module handles the interactive shell: prompt-delimited reads with
//! deadline handling, tail-only pattern search and ANSI stripping.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel, ShellIo};
