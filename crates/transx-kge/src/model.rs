//! Unified KGE model trait.
//!
//! Every model exposes the same capability set, so training and evaluation
//! code can drive any of them through `dyn KgeModel`:
//!
//! | Phase | Method |
//! |-------|--------|
//! | Setup | [`KgeModel::define_parameters`] or [`KgeModel::load_parameters`] |
//! | Training | [`KgeModel::loss`], [`KgeModel::parameter_mut`] |
//! | Inference | [`KgeModel::embed`], [`KgeModel::predict`] |
//! | Evaluation | [`KgeModel::test_batch`] |
//! | Checkpointing | [`KgeModel::parameters`], [`parameters_to_json`] |
//!
//! # Lifecycle
//!
//! A model starts without parameters. `define_parameters` (fresh random
//! tables) or `load_parameters` (restored tables) makes it ready, exactly
//! once. Everything else returns [`Error::NotInitialized`] before that, and
//! a second setup call returns [`Error::AlreadyInitialized`].
//!
//! # Example
//!
//! ```rust
//! use transx_kge::{KgeModel, KgStatistics, ModelConfig, TransR, Triple, TripleBatch};
//!
//! let config = ModelConfig::default().with_ent_hidden_size(8).with_rel_hidden_size(4);
//! let mut model = TransR::new(config, KgStatistics::new(10, 3))?;
//! model.define_parameters(&Vec::<Triple>::new())?;
//!
//! let pos = TripleBatch::new(vec![0, 1], vec![0, 2], vec![3, 4]);
//! let neg = TripleBatch::new(vec![0, 1], vec![0, 2], vec![9, 5]);
//! let loss = model.loss(&pos, &neg)?;
//! assert!(loss >= 0.0);
//!
//! let rankings = model.test_batch(&pos)?;
//! assert_eq!(rankings.tail.shape(), &[2, 10]);
//! # Ok::<(), transx_kge::Error>(())
//! ```

use crate::config::ModelConfig;
use crate::data::{KgStatistics, TripleBatch, TripleSource};
use crate::error::{Error, Result};
use ndarray::{Array, Array2, ArrayD, ArrayViewMutD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

/// Head, relation, and tail embeddings for a batch, one row per example.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    pub heads: Array2<f32>,
    pub relations: Array2<f32>,
    pub tails: Array2<f32>,
}

/// Full candidate rankings for a test batch.
///
/// Row `i` lists every entity id ordered by ascending distance (best
/// first) for example `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rankings {
    /// Candidates for the head slot of `(?, r, t)`.
    pub head: Array2<usize>,
    /// Candidates for the tail slot of `(h, r, ?)`.
    pub tail: Array2<usize>,
}

impl Rankings {
    /// 1-based position of `entity` among head candidates of example `row`.
    pub fn head_rank_of(&self, row: usize, entity: usize) -> Option<usize> {
        rank_in(&self.head, row, entity)
    }

    /// 1-based position of `entity` among tail candidates of example `row`.
    pub fn tail_rank_of(&self, row: usize, entity: usize) -> Option<usize> {
        rank_in(&self.tail, row, entity)
    }
}

fn rank_in(ranking: &Array2<usize>, row: usize, entity: usize) -> Option<usize> {
    if row >= ranking.nrows() {
        return None;
    }
    ranking
        .row(row)
        .iter()
        .position(|&e| e == entity)
        .map(|p| p + 1)
}

/// A named parameter tensor, flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
    /// `false` for statistics frozen at definition time.
    pub trainable: bool,
}

impl Parameter {
    /// Snapshot an array.
    pub fn from_array<D: Dimension>(
        name: &str,
        array: &Array<f32, D>,
        trainable: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
            trainable,
        }
    }

    /// Rebuild the array, checking the stored shape against `expected`.
    pub fn to_array<D: Dimension>(&self, expected: D) -> Result<Array<f32, D>> {
        if self.shape != expected.slice() {
            return Err(Error::ShapeMismatch {
                context: "parameter import",
                expected: expected.slice().to_vec(),
                found: self.shape.clone(),
            });
        }
        let array = ArrayD::from_shape_vec(IxDyn(&self.shape), self.values.clone())?;
        Ok(array.into_dimensionality::<D>()?)
    }
}

/// Serialize a parameter list as a JSON checkpoint.
pub fn parameters_to_json(parameters: &[Parameter]) -> Result<String> {
    Ok(serde_json::to_string(parameters)?)
}

/// Parse a JSON checkpoint written by [`parameters_to_json`].
pub fn parameters_from_json(json: &str) -> Result<Vec<Parameter>> {
    Ok(serde_json::from_str(json)?)
}

/// Take the parameter called `name` out of an imported list.
pub(crate) fn take_parameter(params: &mut Vec<Parameter>, name: &str) -> Result<Parameter> {
    let pos = params
        .iter()
        .position(|p| p.name == name)
        .ok_or_else(|| Error::Validation(format!("checkpoint is missing {name}")))?;
    Ok(params.swap_remove(pos))
}

/// Unified trait for translation-based KGE models.
pub trait KgeModel: Send + Sync {
    /// Model name (e.g., "TransM", "TransR").
    fn name(&self) -> &'static str;

    /// Hyperparameters the model was built with.
    fn config(&self) -> &ModelConfig;

    /// Entity and relation counts the tables are sized for.
    fn statistics(&self) -> &KgStatistics;

    /// Whether parameters exist.
    fn is_ready(&self) -> bool;

    /// Allocate and initialize parameters.
    ///
    /// Models that derive statistics from the training set read it from
    /// `source`; others ignore it.
    fn define_parameters(&mut self, source: &dyn TripleSource) -> Result<()>;

    /// Embed a batch of triples.
    fn embed(&self, batch: &TripleBatch) -> Result<Embeddings>;

    /// Margin ranking loss of positive against corrupted triples.
    fn loss(&self, positive: &TripleBatch, negative: &TripleBatch) -> Result<f32>;

    /// Indices of the `topk` lowest-distance triples of a broadcast batch.
    ///
    /// `None` returns the full ordering.
    fn predict(&self, batch: &TripleBatch, topk: Option<usize>) -> Result<Vec<usize>>;

    /// Rank every entity as head and as tail for each example.
    fn test_batch(&self, batch: &TripleBatch) -> Result<Rankings>;

    /// Snapshot of all parameters, trainable and frozen.
    fn parameters(&self) -> Result<Vec<Parameter>>;

    /// Restore parameters exported by [`KgeModel::parameters`].
    fn load_parameters(&mut self, parameters: Vec<Parameter>) -> Result<()>;

    /// Mutable view of a trainable parameter, for an external optimizer.
    fn parameter_mut(&mut self, name: &str) -> Result<ArrayViewMutD<'_, f32>>;

    /// Names of the exported parameters, in export order.
    fn parameter_names(&self) -> Result<Vec<String>> {
        Ok(self.parameters()?.into_iter().map(|p| p.name).collect())
    }
}

/// Keep the first `topk` entries of a best-first ordering.
pub fn select_topk(order: Vec<usize>, topk: Option<usize>) -> Result<Vec<usize>> {
    match topk {
        None => Ok(order),
        Some(k) if k > order.len() => Err(Error::Validation(format!(
            "topk {} exceeds {} candidates",
            k,
            order.len()
        ))),
        Some(k) => {
            let mut order = order;
            order.truncate(k);
            Ok(order)
        }
    }
}
