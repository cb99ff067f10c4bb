//! kiln-sim — parameterized hardware cost simulator.
//!
//! Replays the instruction trace produced by `kiln-codegen` against a
//! [`ChipConfig`] (compute width, memory bandwidth, cache size, clock)
//! and reports cycles, execution time, cache behavior, and
//! memory-boundedness. Intended for comparing architectural trade-offs,
//! not for cycle-accurate prediction: there are no pipeline stalls, no
//! real cache eviction, no contention.
//!
//! ```
//! use kiln_sim::{ChipConfig, Simulator};
//!
//! let mut sim = Simulator::new(ChipConfig::default())?;
//! let stats = sim.execute(&[]);
//! assert_eq!(stats.cycles, 0);
//! # Ok::<(), kiln_sim::ConfigError>(())
//! ```

mod cache;
mod config;
mod simulator;
mod stats;

pub use cache::CacheModel;
pub use config::{ChipConfig, ConfigError};
pub use simulator::Simulator;
pub use stats::ExecutionStats;
