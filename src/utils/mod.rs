//! Utility functions and helpers.

pub mod hash;
pub mod logging;

pub use hash::{FileHashes, HashCalculator};
pub use logging::{init_logging, ActivityLog, LogConfig};
