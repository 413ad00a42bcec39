//! User interface components.
//!
//! This module provides:
//! - CLI interface
//! - Progress reporting lives in `scanner::progress`

pub mod cli;

pub use cli::{Cli, Commands, OutputFormat};
