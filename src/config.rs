//! Configuration objects and their builders
//!
//! Builders validate on [`ConfigBuilder::build`], so an invalid configuration
//! never reaches an adapter.

use crate::error::{Error, Result};

/// Trait for building configuration objects with validation
pub trait ConfigBuilder<T> {
    /// Error produced when validation fails
    type Error;

    /// Build the final configuration
    fn build(self) -> Result<T, Self::Error>;

    /// Validate the current state
    fn validate(&self) -> Result<(), Self::Error>;
}

/// Default queue length at which a push stream is paused.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

/// Default queue length below which a paused push stream is resumed.
pub const DEFAULT_LOW_WATER_MARK: usize = 8;

/// Backpressure thresholds for [`FromStream`](crate::stream::FromStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterConfig {
    /// Pause the stream once this many chunks are queued
    pub high_water_mark: usize,
    /// Resume the stream once fewer than this many chunks are queued
    pub low_water_mark: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
        }
    }
}

impl AdapterConfig {
    /// Start a builder seeded with the defaults.
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::default()
    }

    /// Check the thresholds of an already constructed config.
    pub fn validate(&self) -> Result<()> {
        if self.low_water_mark == 0 {
            return Err(Error::InvalidConfig(
                "low_water_mark must be at least 1".to_string(),
            ));
        }
        if self.low_water_mark > self.high_water_mark {
            return Err(Error::InvalidConfig(format!(
                "low_water_mark ({}) exceeds high_water_mark ({})",
                self.low_water_mark, self.high_water_mark
            )));
        }
        Ok(())
    }
}

/// Builder for [`AdapterConfig`]
#[derive(Debug, Clone, Default)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    /// Set the pause threshold.
    pub fn high_water_mark(mut self, chunks: usize) -> Self {
        self.config.high_water_mark = chunks;
        self
    }

    /// Set the resume threshold.
    pub fn low_water_mark(mut self, chunks: usize) -> Self {
        self.config.low_water_mark = chunks;
        self
    }
}

impl ConfigBuilder<AdapterConfig> for AdapterConfigBuilder {
    type Error = Error;

    fn build(self) -> Result<AdapterConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }
}
