//! Signature set: known-malicious content digests keyed by algorithm.

use crate::core::error::{Error, Result};
use crate::core::types::HashAlgorithm;
use crate::utils::hash::FileHashes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Three independent sets of lowercase hex digests.
///
/// Membership in any one set is a positive match. The sets are not kept
/// consistent with each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    #[serde(default, deserialize_with = "normalized")]
    md5: HashSet<String>,
    #[serde(default, deserialize_with = "normalized")]
    sha1: HashSet<String>,
    #[serde(default, deserialize_with = "normalized")]
    sha256: HashSet<String>,
}

fn normalized<'de, D>(deserializer: D) -> std::result::Result<HashSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect())
}

impl SignatureSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a signature file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::SignatureLoad(format!("{}: {}", path.display(), e)))?;
        let set: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::SignatureLoad(format!("{}: {}", path.display(), e)))?;

        log::debug!(
            "Loaded {} signatures from {:?} (md5: {}, sha1: {}, sha256: {})",
            set.len(),
            path,
            set.md5.len(),
            set.sha1.len(),
            set.sha256.len()
        );
        Ok(set)
    }

    /// Load a signature file, creating an empty one if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        log::info!("No signature file at {:?}, creating an empty one", path);
        let set = Self::new();
        set.save(path)?;
        Ok(set)
    }

    /// Save the set, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::SignatureSave(format!("{}: {}", parent.display(), e)))?;
        }

        let mut sorted = serde_json::Map::new();
        for algo in HashAlgorithm::ALL {
            let mut digests: Vec<&String> = self.digests(algo).iter().collect();
            digests.sort();
            sorted.insert(algo.as_str().to_string(), serde_json::to_value(digests)?);
        }
        let contents = serde_json::to_string_pretty(&sorted)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .map_err(|e| Error::SignatureSave(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, path)
            .map_err(|e| Error::SignatureSave(format!("{}: {}", path.display(), e)))
    }

    /// Wholesale replacement of the signature file by an update source.
    ///
    /// Running scanners and monitors keep the set they were started with.
    pub fn replace_file(path: &Path, replacement: &SignatureSet) -> Result<()> {
        replacement.save(path)?;
        log::info!(
            "Signature file {:?} replaced ({} signatures)",
            path,
            replacement.len()
        );
        Ok(())
    }

    /// Add a digest.
    pub fn insert(&mut self, algorithm: HashAlgorithm, digest: &str) -> bool {
        let digest = digest.trim().to_lowercase();
        if digest.is_empty() {
            return false;
        }
        self.digests_mut(algorithm).insert(digest)
    }

    /// Check a single digest.
    pub fn contains(&self, algorithm: HashAlgorithm, digest: &str) -> bool {
        self.digests(algorithm).contains(&digest.to_lowercase())
    }

    /// Return the first algorithm whose set contains the matching digest.
    pub fn lookup(&self, hashes: &FileHashes) -> Option<HashAlgorithm> {
        if self.sha256.contains(&hashes.sha256) {
            return Some(HashAlgorithm::Sha256);
        }
        if self.sha1.contains(&hashes.sha1) {
            return Some(HashAlgorithm::Sha1);
        }
        if self.md5.contains(&hashes.md5) {
            return Some(HashAlgorithm::Md5);
        }
        None
    }

    /// Number of digests for one algorithm.
    pub fn count(&self, algorithm: HashAlgorithm) -> usize {
        self.digests(algorithm).len()
    }

    /// Total digests across all algorithms.
    pub fn len(&self) -> usize {
        self.md5.len() + self.sha1.len() + self.sha256.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn digests(&self, algorithm: HashAlgorithm) -> &HashSet<String> {
        match algorithm {
            HashAlgorithm::Md5 => &self.md5,
            HashAlgorithm::Sha1 => &self.sha1,
            HashAlgorithm::Sha256 => &self.sha256,
        }
    }

    fn digests_mut(&mut self, algorithm: HashAlgorithm) -> &mut HashSet<String> {
        match algorithm {
            HashAlgorithm::Md5 => &mut self.md5,
            HashAlgorithm::Sha1 => &mut self.sha1,
            HashAlgorithm::Sha256 => &mut self.sha256,
        }
    }
}
