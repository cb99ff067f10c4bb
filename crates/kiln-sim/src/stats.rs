//! Aggregate execution statistics.

use std::fmt;

use serde::Serialize;

/// Aggregate result of one simulated trace replay.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    /// Total cycles across all instructions.
    pub cycles: u64,
    /// LOAD and STORE instruction count.
    pub memory_accesses: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// `cycles / (clock_ghz * 1e6)`.
    pub execution_time_ms: f64,
    /// Share of compute cycles in compute+memory cycles, percent.
    pub compute_utilization: f64,
    /// Share of memory cycles in compute+memory cycles, percent.
    pub memory_bound_time: f64,
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lookups = (self.cache_hits + self.cache_misses).max(1) as f64;
        writeln!(f, "=== Execution Statistics ===")?;
        writeln!(f, "Total cycles:          {}", self.cycles)?;
        writeln!(f, "Execution time:        {:.2} ms", self.execution_time_ms)?;
        writeln!(f, "Memory accesses:       {}", self.memory_accesses)?;
        writeln!(
            f,
            "Cache hits:            {} ({:.2}%)",
            self.cache_hits,
            100.0 * self.cache_hits as f64 / lookups
        )?;
        writeln!(
            f,
            "Cache misses:          {} ({:.2}%)",
            self.cache_misses,
            100.0 * self.cache_misses as f64 / lookups
        )?;
        writeln!(
            f,
            "Compute utilization:   {:.2}%",
            self.compute_utilization
        )?;
        writeln!(f, "Memory bound time:     {:.2}%", self.memory_bound_time)?;
        write!(f, "-----------------------")
    }
}
