//! Byte-pattern heuristics for script and executable content.
//!
//! This is a plain containment search. Obfuscated, packed or encoded
//! content will not match; that is a known limitation of the approach.

use aho_corasick::AhoCorasick;
use std::path::Path;

/// A suspicious indicator and what it suggests.
#[derive(Debug, Clone, Copy)]
pub struct SuspiciousPattern {
    pub bytes: &'static [u8],
    pub description: &'static str,
}

/// Shell/command-injection and process-injection indicators.
pub const SUSPICIOUS_PATTERNS: &[SuspiciousPattern] = &[
    SuspiciousPattern {
        bytes: b"CreateRemoteThread",
        description: "CreateRemoteThread (process injection)",
    },
    SuspiciousPattern {
        bytes: b"VirtualAllocEx",
        description: "VirtualAllocEx (process injection)",
    },
    SuspiciousPattern {
        bytes: b"WriteProcessMemory",
        description: "WriteProcessMemory (process injection)",
    },
    SuspiciousPattern {
        bytes: b"ShellExecute",
        description: "ShellExecute (command execution)",
    },
    SuspiciousPattern {
        bytes: b"WScript.Shell",
        description: "WScript.Shell (script host execution)",
    },
    SuspiciousPattern {
        bytes: b"cmd.exe /c",
        description: "cmd.exe /c (command execution)",
    },
    SuspiciousPattern {
        bytes: b"powershell -e",
        description: "powershell -e (encoded PowerShell)",
    },
    SuspiciousPattern {
        bytes: b"net user /add",
        description: "net user /add (account creation)",
    },
    SuspiciousPattern {
        bytes: b"reg add HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Run",
        description: "Run key registration (persistence)",
    },
];

/// Stateless classifier over file content.
pub struct HeuristicClassifier {
    patterns: &'static [SuspiciousPattern],
    matcher: Option<AhoCorasick>,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicClassifier {
    /// Create a classifier over the built-in pattern list.
    pub fn new() -> Self {
        let matcher = AhoCorasick::new(SUSPICIOUS_PATTERNS.iter().map(|p| p.bytes)).ok();
        if matcher.is_none() {
            log::warn!("Failed to build heuristic automaton, falling back to linear search");
        }

        Self {
            patterns: SUSPICIOUS_PATTERNS,
            matcher,
        }
    }

    /// Return the description of the first suspicious pattern found in `data`.
    pub fn classify(&self, data: &[u8]) -> Option<&'static str> {
        match &self.matcher {
            Some(matcher) => matcher
                .find(data)
                .map(|m| self.patterns[m.pattern().as_usize()].description),
            None => self
                .patterns
                .iter()
                .find(|p| contains(data, p.bytes))
                .map(|p| p.description),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Lowercase extension of a path without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Check an extension against an allow-list (case-insensitive, dot optional).
pub fn extension_allowed(path: &Path, allowed: &[String]) -> bool {
    match extension_of(path) {
        Some(ext) => allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        None => false,
    }
}
