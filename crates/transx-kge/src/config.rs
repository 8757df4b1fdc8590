//! Model hyperparameters.
//!
//! Configuration is handed to a model at construction and never changes
//! afterwards. It is built with `Default` plus consuming `with_*` methods,
//! or deserialized by whatever owns the experiment setup.
//!
//! ```rust
//! use transx_kge::ModelConfig;
//!
//! let config = ModelConfig::default()
//!     .with_ent_hidden_size(64)
//!     .with_rel_hidden_size(32)
//!     .with_margin(2.0)
//!     .with_l1_flag(false);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Error, Result};
use crate::loss::Reduction;
use serde::{Deserialize, Serialize};

/// Hyperparameters shared by TransM and TransR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Entity embedding dimension `k` (default: 50).
    ///
    /// TransM uses this size for relations too.
    pub ent_hidden_size: usize,
    /// Relation space dimension `d` for TransR (default: 50).
    pub rel_hidden_size: usize,
    /// Margin for the ranking loss (default: 1.0).
    pub margin: f32,
    /// L1 distance when true, squared L2 otherwise (default: true).
    pub l1_flag: bool,
    /// Training batch size (default: 128).
    ///
    /// Advisory: the caller's batcher reads it. `loss` scores whatever batch
    /// it is handed.
    pub batch_size_training: usize,
    /// Evaluation batch size (default: 16).
    ///
    /// Advisory: `test_batch` ranks the whole batch it is handed in one pass
    /// and never chunks by this value.
    pub batch_size_testing: usize,
    /// How per-example hinge terms are aggregated (default: sum).
    pub loss_reduction: Reduction,
    /// Seed for parameter initialization (default: 42).
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ent_hidden_size: 50,
            rel_hidden_size: 50,
            margin: 1.0,
            l1_flag: true,
            batch_size_training: 128,
            batch_size_testing: 16,
            loss_reduction: Reduction::Sum,
            seed: 42,
        }
    }
}

impl ModelConfig {
    /// Set both `k` and `d` to the same size.
    pub fn with_hidden_size(mut self, size: usize) -> Self {
        self.ent_hidden_size = size;
        self.rel_hidden_size = size;
        self
    }

    pub fn with_ent_hidden_size(mut self, k: usize) -> Self {
        self.ent_hidden_size = k;
        self
    }

    pub fn with_rel_hidden_size(mut self, d: usize) -> Self {
        self.rel_hidden_size = d;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_l1_flag(mut self, l1: bool) -> Self {
        self.l1_flag = l1;
        self
    }

    pub fn with_batch_size_training(mut self, batch_size: usize) -> Self {
        self.batch_size_training = batch_size;
        self
    }

    pub fn with_batch_size_testing(mut self, batch_size: usize) -> Self {
        self.batch_size_testing = batch_size;
        self
    }

    pub fn with_loss_reduction(mut self, reduction: Reduction) -> Self {
        self.loss_reduction = reduction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.ent_hidden_size == 0 {
            return Err(Error::Validation("ent_hidden_size must be > 0".into()));
        }
        if self.rel_hidden_size == 0 {
            return Err(Error::Validation("rel_hidden_size must be > 0".into()));
        }
        if !(self.margin.is_finite() && self.margin > 0.0) {
            return Err(Error::Validation(format!(
                "margin must be positive and finite, got {}",
                self.margin
            )));
        }
        if self.batch_size_training == 0 || self.batch_size_testing == 0 {
            return Err(Error::Validation("batch sizes must be > 0".into()));
        }
        Ok(())
    }
}
