//! KGE model implementations.
//!
//! Each model implements the [`KgeModel`](crate::KgeModel) trait and owns
//! its parameter tables as `ndarray` arrays.
//!
//! | Model | Relation as | Extra parameters |
//! |-------|-------------|------------------|
//! | [`TransM`] | weighted translation | frozen θ per relation |
//! | [`TransR`] | translation after projection | `k × d` matrix per relation |
//!
//! # Example
//!
//! ```rust
//! use transx_kge::{KgeModel, KgStatistics, ModelConfig, TransM, TransR, Triple, TripleBatch};
//!
//! let stats = KgStatistics::new(4, 2);
//! let config = ModelConfig::default().with_hidden_size(8);
//! let train = vec![Triple::new(0, 0, 1), Triple::new(2, 1, 3)];
//!
//! let mut models: Vec<Box<dyn KgeModel>> = vec![
//!     Box::new(TransM::new(config.clone(), stats)?),
//!     Box::new(TransR::new(config, stats)?),
//! ];
//! let batch = TripleBatch::from(train.as_slice());
//! for model in &mut models {
//!     model.define_parameters(&train)?;
//!     assert!(model.loss(&batch, &batch)?.is_finite());
//! }
//! # Ok::<(), transx_kge::Error>(())
//! ```

mod transm;
mod transr;

pub use transm::{RelationMappingStats, RelationWeights, TransM};
pub use transr::TransR;
