//! Cool-down bookkeeping for the real-time monitor.
//!
//! Maps a path to the instant it was last inspected. The map is bounded: when
//! full, the path inspected longest ago is evicted.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Bounded path -> last-inspection map.
#[derive(Debug)]
pub struct WatchState {
    capacity: usize,
    /// Path -> (last inspected, generation)
    entries: HashMap<PathBuf, (Instant, u64)>,
    /// Generation -> path, oldest first
    order: BTreeMap<u64, PathBuf>,
    next_generation: u64,
}

impl WatchState {
    /// Create a state holding at most `capacity` paths (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_generation: 0,
        }
    }

    /// Whether `path` is outside its cool-down window at `now`.
    pub fn should_inspect(&self, path: &Path, now: Instant, cooldown: Duration) -> bool {
        match self.entries.get(path) {
            Some((last, _)) => now.saturating_duration_since(*last) >= cooldown,
            None => true,
        }
    }

    /// Record an inspection of `path` at `now`.
    pub fn record(&mut self, path: &Path, now: Instant) {
        let generation = self.next_generation;
        self.next_generation += 1;

        if let Some((_, old)) = self.entries.remove(path) {
            self.order.remove(&old);
        } else if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.entries.insert(path.to_path_buf(), (now, generation));
        self.order.insert(generation, path.to_path_buf());
    }

    fn evict_oldest(&mut self) {
        if let Some((_, path)) = self.order.pop_first() {
            log::trace!("Evicting watch entry {}", path.display());
            self.entries.remove(&path);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }
}
