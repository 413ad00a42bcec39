//! ArcSentinel: endpoint malware detection and containment.
//!
//! This crate provides signature and heuristic file inspection, an on-demand
//! scanner, real-time protection over watched directories, and a reversible
//! quarantine store.

pub mod core;
pub mod detection;
pub mod monitor;
pub mod quarantine;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
