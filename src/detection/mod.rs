//! Malware detection: signature lookup, heuristics and path exclusion.
//!
//! - Signature-based detection (md5/sha1/sha256 digest sets)
//! - Heuristic analysis (suspicious byte patterns in scripts and executables)
//! - Exclusion filtering by directory prefix
//! - The per-file inspector that combines all three

pub mod exclusion;
pub mod heuristic;
pub mod inspector;
pub mod signature;

pub use exclusion::ExclusionFilter;
pub use heuristic::{HeuristicClassifier, SuspiciousPattern, SUSPICIOUS_PATTERNS};
pub use inspector::{ContentSource, FileInspector, FsContentSource};
pub use signature::SignatureSet;
