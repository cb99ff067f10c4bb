//! Hardware configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameterized hardware description the simulator runs against.
///
/// All five fields must be positive; [`ChipConfig::validate`] is
/// checked once when a [`crate::Simulator`] binds to the config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChipConfig {
    /// Number of parallel compute units.
    pub compute_units: u32,
    /// Memory bandwidth in GB/s.
    pub memory_bandwidth_gb_s: f64,
    /// Cache size in KB.
    pub cache_size_kb: u32,
    /// SIMD vector width per compute unit.
    pub simd_width: u32,
    /// Clock frequency in GHz.
    pub clock_freq_ghz: f64,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            compute_units: 16,
            memory_bandwidth_gb_s: 100.0,
            cache_size_kb: 256,
            simd_width: 8,
            clock_freq_ghz: 1.5,
        }
    }
}

impl ChipConfig {
    /// Check that every field is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_units == 0 {
            return Err(ConfigError::NonPositive("compute_units"));
        }
        if !(self.memory_bandwidth_gb_s > 0.0) {
            return Err(ConfigError::NonPositive("memory_bandwidth_gb_s"));
        }
        if self.cache_size_kb == 0 {
            return Err(ConfigError::NonPositive("cache_size_kb"));
        }
        if self.simd_width == 0 {
            return Err(ConfigError::NonPositive("simd_width"));
        }
        if !(self.clock_freq_ghz > 0.0) {
            return Err(ConfigError::NonPositive("clock_freq_ghz"));
        }
        Ok(())
    }
}

impl fmt::Display for ChipConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ChipConfig{{")?;
        writeln!(f, "  compute_units: {}", self.compute_units)?;
        writeln!(f, "  memory_bandwidth: {} GB/s", self.memory_bandwidth_gb_s)?;
        writeln!(f, "  cache_size: {} KB", self.cache_size_kb)?;
        writeln!(f, "  simd_width: {}", self.simd_width)?;
        writeln!(f, "  clock_freq: {} GHz", self.clock_freq_ghz)?;
        write!(f, "}}")
    }
}

/// Invalid hardware configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The named field must be positive.
    NonPositive(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive(field) => {
                write!(f, "chip config field {field} must be positive")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
