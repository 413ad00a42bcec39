//! Per-file inspection: exclusion, size guard, digests, heuristics.

use crate::core::config::Config;
use crate::core::types::{SkipReason, Verdict};
use crate::detection::exclusion::ExclusionFilter;
use crate::detection::heuristic::{extension_allowed, HeuristicClassifier};
use crate::detection::signature::SignatureSet;
use crate::utils::hash::HashCalculator;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Where file sizes and contents come from.
pub trait ContentSource: Send + Sync {
    /// Size of the file in bytes.
    fn size(&self, path: &Path) -> io::Result<u64>;

    /// Full content of the file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads straight from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentSource;

impl ContentSource for FsContentSource {
    fn size(&self, path: &Path) -> io::Result<u64> {
        std::fs::metadata(path).map(|m| m.len())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Composes the signature set, exclusion filter and heuristic classifier into
/// a single verdict per file. Shared read-only between scanner and monitor.
pub struct FileInspector {
    signatures: Arc<SignatureSet>,
    exclusions: Arc<ExclusionFilter>,
    classifier: HeuristicClassifier,
    heuristic_extensions: Vec<String>,
    max_file_size: u64,
    source: Arc<dyn ContentSource>,
}

impl FileInspector {
    pub fn new(
        signatures: Arc<SignatureSet>,
        exclusions: Arc<ExclusionFilter>,
        heuristic_extensions: Vec<String>,
        max_file_size: u64,
    ) -> Self {
        Self {
            signatures,
            exclusions,
            classifier: HeuristicClassifier::new(),
            heuristic_extensions,
            max_file_size,
            source: Arc::new(FsContentSource),
        }
    }

    /// Inspector configured for on-demand scans.
    pub fn for_scanner(config: &Config, signatures: Arc<SignatureSet>) -> Self {
        Self::new(
            signatures,
            Arc::new(ExclusionFilter::new(&config.scan.excluded_paths)),
            config.scan.heuristic_extensions.clone(),
            config.scan.max_file_size(),
        )
    }

    /// Inspector configured for real-time protection, which applies
    /// heuristics to every watched extension.
    pub fn for_monitor(config: &Config, signatures: Arc<SignatureSet>) -> Self {
        Self::new(
            signatures,
            Arc::new(ExclusionFilter::new(&config.scan.excluded_paths)),
            config.monitor.watched_extensions.clone(),
            config.scan.max_file_size(),
        )
    }

    /// Replace the content source.
    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = source;
        self
    }

    /// The exclusion filter this inspector applies.
    pub fn exclusions(&self) -> &ExclusionFilter {
        &self.exclusions
    }

    /// Inspect one file. Never fails: I/O problems become `Skipped`.
    pub fn inspect(&self, path: &Path) -> Verdict {
        if self.exclusions.is_excluded(path) {
            return Verdict::Skipped(SkipReason::Excluded);
        }

        let size = match self.source.size(path) {
            Ok(size) => size,
            Err(e) => return Verdict::Skipped(SkipReason::Io(e.to_string())),
        };
        if size > self.max_file_size {
            return Verdict::Skipped(SkipReason::Oversize);
        }

        let data = match self.source.read(path) {
            Ok(data) => data,
            Err(e) => return Verdict::Skipped(SkipReason::Io(e.to_string())),
        };

        let hashes = HashCalculator::digest_bytes(&data);
        if let Some(algorithm) = self.signatures.lookup(&hashes) {
            return Verdict::SignatureMatch(algorithm);
        }

        if extension_allowed(path, &self.heuristic_extensions) {
            if let Some(description) = self.classifier.classify(&data) {
                return Verdict::HeuristicMatch(description.to_string());
            }
        }

        Verdict::Clean
    }
}
