//! Counter-based cache capacity model.

/// Tracks cache occupancy as a single running byte counter.
///
/// Not a real cache: no addressing, no associativity, no eviction. A
/// request hits iff it fits in the remaining capacity, in which case it
/// claims that space. Usage saturates at capacity on a miss.
#[derive(Debug)]
pub struct CacheModel {
    capacity_bytes: u64,
    current_usage: u64,
    hits: u64,
    misses: u64,
}

impl CacheModel {
    pub fn new(size_kb: u32) -> Self {
        Self {
            capacity_bytes: size_kb as u64 * 1024,
            current_usage: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Record an access of `size` bytes. Returns true on a hit.
    pub fn access(&mut self, size: u64) -> bool {
        if size <= self.capacity_bytes && self.current_usage + size <= self.capacity_bytes {
            self.current_usage += size;
            self.hits += 1;
            return true;
        }
        self.misses += 1;
        self.current_usage = (self.current_usage + size).min(self.capacity_bytes);
        false
    }

    /// Clear occupancy and counters before a new simulation run.
    pub fn reset(&mut self) {
        self.current_usage = 0;
        self.hits = 0;
        self.misses = 0;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
