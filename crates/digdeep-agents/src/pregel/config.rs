//! Pregel runtime configuration

use serde::{Deserialize, Serialize};

/// Pregel runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PregelConfig {
    /// Maximum supersteps before forced termination
    pub max_supersteps: usize,

    /// Checkpoint frequency (every N supersteps, 0 = disabled)
    pub checkpoint_interval: usize,
}

impl Default for PregelConfig {
    fn default() -> Self {
        Self {
            max_supersteps: 50,
            checkpoint_interval: 1,
        }
    }
}

impl PregelConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum supersteps
    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = max;
        self
    }

    /// Set checkpoint interval
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Whether a checkpoint is due after `superstep` supersteps have run
    pub fn should_checkpoint(&self, superstep: usize) -> bool {
        self.checkpoint_interval > 0 && superstep % self.checkpoint_interval == 0
    }
}
