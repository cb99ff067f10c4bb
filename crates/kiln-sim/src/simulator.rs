//! Trace replay against the hardware cost model.

use kiln_codegen::{InstrKind, Instruction};
use tracing::debug;

use crate::cache::CacheModel;
use crate::config::{ChipConfig, ConfigError};
use crate::stats::ExecutionStats;

/// Fixed cost of a cache-hit load, in cycles.
const CACHE_HIT_CYCLES: u64 = 10;
/// Floor for any memory transfer, in cycles.
const MEMORY_FLOOR_CYCLES: u64 = 100;
/// Fixed cost of a synchronization barrier, in cycles.
const SYNC_CYCLES: u64 = 10;

/// Replays instruction traces against one [`ChipConfig`].
///
/// One simulator binds to one config and its derived cache model for
/// its lifetime. The cache is reset at the start of every
/// [`Simulator::execute`] call, so runs never leak state into each
/// other.
pub struct Simulator {
    config: ChipConfig,
    cache: CacheModel,
}

impl Simulator {
    /// Bind a simulator to a hardware config. Fails on a non-positive
    /// config field.
    pub fn new(config: ChipConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = CacheModel::new(config.cache_size_kb);
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &ChipConfig {
        &self.config
    }

    /// Replay a trace and aggregate execution statistics.
    pub fn execute(&mut self, instructions: &[Instruction]) -> ExecutionStats {
        self.cache.reset();

        let mut stats = ExecutionStats::default();
        let mut compute_cycles = 0u64;
        let mut memory_cycles = 0u64;

        for inst in instructions {
            let cycles = match inst.kind {
                InstrKind::Load => {
                    let cycles = self.load_cycles(inst);
                    memory_cycles += cycles;
                    stats.memory_accesses += 1;
                    cycles
                }
                InstrKind::Store => {
                    let cycles = self.store_cycles(inst);
                    memory_cycles += cycles;
                    stats.memory_accesses += 1;
                    cycles
                }
                InstrKind::Compute => {
                    let cycles = self.compute_cycles(inst);
                    compute_cycles += cycles;
                    cycles
                }
                InstrKind::Sync => SYNC_CYCLES,
            };
            stats.cycles += cycles;
        }

        stats.cache_hits = self.cache.hits();
        stats.cache_misses = self.cache.misses();
        stats.execution_time_ms = stats.cycles as f64 / (self.config.clock_freq_ghz * 1e6);

        let busy_cycles = compute_cycles + memory_cycles;
        if busy_cycles > 0 {
            stats.compute_utilization = 100.0 * compute_cycles as f64 / busy_cycles as f64;
            stats.memory_bound_time = 100.0 * memory_cycles as f64 / busy_cycles as f64;
        }

        debug!(
            cycles = stats.cycles,
            hits = stats.cache_hits,
            misses = stats.cache_misses,
            "simulation finished"
        );
        stats
    }

    /// One cycle moves `bandwidth / clock` bytes.
    fn bytes_per_cycle(&self) -> f64 {
        (self.config.memory_bandwidth_gb_s * 1e9) / (self.config.clock_freq_ghz * 1e9)
    }

    fn load_cycles(&mut self, inst: &Instruction) -> u64 {
        if self.cache.access(inst.input_bytes) {
            return CACHE_HIT_CYCLES;
        }
        let cycles = (inst.input_bytes as f64 / self.bytes_per_cycle()) as u64;
        cycles.max(MEMORY_FLOOR_CYCLES)
    }

    fn store_cycles(&self, inst: &Instruction) -> u64 {
        let cycles = (inst.output_bytes as f64 / self.bytes_per_cycle()) as u64;
        cycles.max(MEMORY_FLOOR_CYCLES)
    }

    fn compute_cycles(&self, inst: &Instruction) -> u64 {
        let flops_per_cycle =
            self.config.compute_units as f64 * self.config.simd_width as f64 * 2.0;
        let cycles = (inst.flops as f64 / flops_per_cycle) as u64;
        cycles.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(kind: InstrKind, input_bytes: u64, output_bytes: u64, flops: u64) -> Instruction {
        Instruction {
            kind,
            op_name: "Conv2D",
            input_bytes,
            output_bytes,
            flops,
        }
    }

    fn sim(config: ChipConfig) -> Simulator {
        Simulator::new(config).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ChipConfig::default();
        config.simd_width = 0;
        assert!(Simulator::new(config).is_err());
    }

    #[test]
    fn empty_trace_normalizes_to_zero() {
        let stats = sim(ChipConfig::default()).execute(&[]);
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.execution_time_ms, 0.0);
        assert_eq!(stats.compute_utilization, 0.0);
        assert_eq!(stats.memory_bound_time, 0.0);
    }

    #[test]
    fn cache_hit_load_costs_ten() {
        // Small load fits the cache.
        let stats = sim(ChipConfig::default()).execute(&[inst(InstrKind::Load, 64, 0, 0)]);
        assert_eq!(stats.cycles, 10);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.memory_accesses, 1);
    }

    #[test]
    fn cache_miss_load_floors_at_hundred() {
        // 1 MB load misses a 256 KB cache. At 100 GB/s / 1.5 GHz,
        // bytes_per_cycle = 66.67, so 1 MB takes ~15728 cycles.
        let stats =
            sim(ChipConfig::default()).execute(&[inst(InstrKind::Load, 1 << 20, 0, 0)]);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cycles, ((1u64 << 20) as f64 / (100.0 / 1.5)) as u64);

        // Zero-size miss path still costs the floor. Fill the cache
        // first so the follow-up 1-byte load misses.
        let mut s = sim(ChipConfig {
            cache_size_kb: 1,
            ..ChipConfig::default()
        });
        let stats = s.execute(&[
            inst(InstrKind::Load, 2048, 0, 0),
            inst(InstrKind::Load, 1, 0, 0),
        ]);
        assert_eq!(stats.cache_misses, 2);
        // Both transfers are tiny; both hit the 100-cycle floor.
        assert_eq!(stats.cycles, 200);
    }

    #[test]
    fn store_floors_at_hundred_and_skips_cache() {
        let stats = sim(ChipConfig::default()).execute(&[inst(InstrKind::Store, 0, 0, 0)]);
        assert_eq!(stats.cycles, 100);
        assert_eq!(stats.memory_accesses, 1);
        // Stores never consult the cache model.
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[test]
    fn compute_floors_at_one() {
        let stats = sim(ChipConfig::default()).execute(&[inst(InstrKind::Compute, 0, 0, 0)]);
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.memory_accesses, 0);
    }

    #[test]
    fn compute_scales_with_width() {
        // 16 units * 8 lanes * 2 = 256 flops/cycle.
        let stats = sim(ChipConfig::default())
            .execute(&[inst(InstrKind::Compute, 0, 0, 256_000)]);
        assert_eq!(stats.cycles, 1000);
    }

    #[test]
    fn sync_counts_in_neither_bucket() {
        let stats = sim(ChipConfig::default()).execute(&[inst(InstrKind::Sync, 0, 0, 0)]);
        assert_eq!(stats.cycles, 10);
        assert_eq!(stats.memory_accesses, 0);
        assert_eq!(stats.compute_utilization, 0.0);
        assert_eq!(stats.memory_bound_time, 0.0);
    }

    #[test]
    fn utilization_splits_busy_cycles() {
        // One 10-cycle hit load plus computes worth 10 cycles.
        let stats = sim(ChipConfig::default()).execute(&[
            inst(InstrKind::Load, 64, 0, 0),
            inst(InstrKind::Compute, 0, 0, 2560),
        ]);
        assert_eq!(stats.compute_utilization, 50.0);
        assert_eq!(stats.memory_bound_time, 50.0);
    }

    #[test]
    fn execution_time_uses_clock() {
        let mut s = sim(ChipConfig {
            clock_freq_ghz: 2.0,
            ..ChipConfig::default()
        });
        let stats = s.execute(&[inst(InstrKind::Sync, 0, 0, 0)]);
        assert_eq!(stats.execution_time_ms, 10.0 / 2e6);
    }

    #[test]
    fn runs_do_not_leak_cache_state() {
        let mut s = sim(ChipConfig {
            cache_size_kb: 1,
            ..ChipConfig::default()
        });
        let fill = vec![inst(InstrKind::Load, 1024, 0, 0); 2];
        let first = s.execute(&fill);
        assert_eq!(first.cache_hits, 1);
        assert_eq!(first.cache_misses, 1);
        // Same trace, same result: the cache was reset in between.
        let second = s.execute(&fill);
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.cache_misses, 1);
    }
}
