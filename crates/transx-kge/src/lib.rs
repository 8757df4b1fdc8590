//! Translation-based Knowledge Graph Embeddings: TransM and TransR.
//!
//! Knowledge graphs store facts as (head, relation, tail) triples. The
//! translation family of KGE models embeds entities and relations so that
//! **a true fact's head, moved by its relation, lands near its tail**:
//!
//! ```text
//!   h ----r----> t        h + r ≈ t
//! ```
//!
//! Plausibility is a distance, so lower is better. Training pushes true
//! triples at least a margin closer than corrupted ones; evaluation ranks
//! every entity as the missing head or tail.
//!
//! ## Models
//!
//! | Model | Hypothesis | Distance |
//! |-------|------------|----------|
//! | TransM | relations translate, weighted by how many-to-many they are | θ_r · \|\|h + r − t\|\| |
//! | TransR | relations translate in their own projected space | \|\|h·M_r + r − t·M_r\|\| |
//!
//! Distances use L1 or squared L2 depending on
//! [`ModelConfig::l1_flag`].
//!
//! ## What lives here and what does not
//!
//! This crate is the embedding, scoring, and ranking core. Loading datasets,
//! sampling negatives, stepping an optimizer, and reporting metrics belong to
//! the caller, which talks to the models through:
//!
//! - [`TripleSource`] for the training set needed at parameter definition,
//! - [`TripleBatch`] for positive, negative, and test batches,
//! - [`KgeModel::parameter_mut`] for in-place optimizer updates,
//! - [`KgeModel::parameters`] / [`KgeModel::load_parameters`] for checkpoints.
//!
//! ## Usage
//!
//! ```rust
//! use transx_kge::{KgeModel, KgStatistics, ModelConfig, TransM, Triple, TripleBatch};
//!
//! let train = vec![
//!     Triple::new(0, 0, 1),
//!     Triple::new(1, 0, 2),
//!     Triple::new(2, 1, 0),
//! ];
//! let mut model = TransM::new(
//!     ModelConfig::default().with_hidden_size(16).with_margin(1.0),
//!     KgStatistics::new(3, 2),
//! )?;
//! model.define_parameters(&train)?;
//!
//! let pos = TripleBatch::from(train.as_slice());
//! let neg = TripleBatch::new(vec![0, 1, 2], vec![0, 0, 1], vec![2, 0, 1]);
//! let loss = model.loss(&pos, &neg)?;
//!
//! let rankings = model.test_batch(&pos)?;
//! let rank = rankings.tail_rank_of(0, 1);
//! assert!(rank.is_some());
//! # let _ = loss;
//! # Ok::<(), transx_kge::Error>(())
//! ```
//!
//! ## References
//!
//! - Fan et al. (2014). "Transition-based Knowledge Graph Embedding with
//!   Relational Mapping Properties." PACLIC.
//! - Lin et al. (2015). "Learning Entity and Relation Embeddings for
//!   Knowledge Graph Completion." AAAI.

pub mod config;
pub mod data;
mod error;
pub mod init;
pub mod loss;
mod model;
pub mod models;
pub mod ops;
pub mod scoring;

pub use config::ModelConfig;
pub use data::{CacheKey, KgStatistics, Triple, TripleBatch, TripleCache, TripleSource};
pub use error::{Error, Result};
pub use loss::{pairwise_margin_loss, Reduction};
pub use model::{
    parameters_from_json, parameters_to_json, Embeddings, KgeModel, Parameter, Rankings,
};
pub use models::{RelationMappingStats, RelationWeights, TransM, TransR};
pub use scoring::Norm;
