//! TransR: translations in relation-specific spaces.
//!
//! TransR ([Lin et al. 2015](https://ojs.aaai.org/index.php/AAAI/article/view/9491))
//! separates entity space (`k` dimensions) from relation space (`d`
//! dimensions). Every relation owns a `k × d` projection matrix `M_r`:
//!
//! ```text
//! h_r = h · M_r        t_r = t · M_r
//! score(h, r, t) = ||h_r + r − t_r||
//! ```
//!
//! Projection lets one entity look different under different relations, so
//! N-to-N relations no longer force unrelated entities onto the same point.
//!
//! # Batched evaluation
//!
//! Ranking every candidate entity would naively take one projection per
//! (entity, example) pair. Instead the batch's matrices are stacked into
//! a single `[b·d, k]` block and the whole normalized entity table is
//! projected with one matrix multiply:
//!
//! ```text
//! [b, k, d] → transpose → [b, d, k] → reshape → [b·d, k]
//! [N, k] · [b·d, k]ᵀ = [N, b·d] → reshape → [N, b, d] → transpose → [b, N, d]
//! ```

use crate::config::ModelConfig;
use crate::data::{KgStatistics, TripleBatch, TripleSource};
use crate::error::{Error, Result};
use crate::init::VarianceScaling;
use crate::loss::pairwise_margin_loss;
use crate::model::{select_topk, take_parameter, Embeddings, KgeModel, Parameter, Rankings};
use crate::ops::{argsort, argsort_rows, gather_rows, l2_normalize};
use crate::scoring::{self, Norm};
use ndarray::{
    Array, Array1, Array2, Array3, ArrayView, ArrayView2, ArrayViewMutD, Axis, Dim, DimMax,
    Dimension, Ix2, Ix3, RemoveAxis,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

const NAME: &str = "TransR";

const ENTITY_EMBEDDINGS: &str = "entity_embeddings";
const RELATION_EMBEDDINGS: &str = "relation_embeddings";
const RELATION_MATRICES: &str = "relation_matrices";

#[derive(Debug, Clone)]
struct Params {
    /// [N_e, k]
    entities: Array2<f32>,
    /// [N_r, d]
    relations: Array2<f32>,
    /// [N_r, k, d]
    matrices: Array3<f32>,
}

/// TransR model.
#[derive(Debug, Clone)]
pub struct TransR {
    config: ModelConfig,
    stats: KgStatistics,
    norm: Norm,
    params: Option<Params>,
}

impl TransR {
    /// Create an uninitialized model with entity size `k` and relation size `d`.
    pub fn new(config: ModelConfig, stats: KgStatistics) -> Result<Self> {
        config.validate()?;
        stats.validate()?;
        let norm = Norm::from_l1_flag(config.l1_flag);
        Ok(Self {
            config,
            stats,
            norm,
            params: None,
        })
    }

    fn params(&self) -> Result<&Params> {
        self.params
            .as_ref()
            .ok_or(Error::NotInitialized { model: NAME })
    }

    /// Normalize `h`, `r`, `t` along `axis`, then reduce `norm(h + r − t)`
    /// along it.
    ///
    /// With `[b, d]` operands and `Axis(1)` this scores each example. With
    /// `[b, N, d]` candidates against `[b, 1, d]` operands and `Axis(2)` it
    /// scores every candidate for every example.
    pub fn dissimilarity<D>(
        &self,
        h: ArrayView<'_, f32, D>,
        r: ArrayView<'_, f32, D>,
        t: ArrayView<'_, f32, D>,
        axis: Axis,
    ) -> Result<Array<f32, D::Smaller>>
    where
        D: Dimension + RemoveAxis + DimMax<D, Output = D>,
    {
        scoring::dissimilarity(h, r, t, axis, self.norm)
    }

    /// Project each row of `rows` through the matrix of the matching relation.
    fn project(&self, rows: ArrayView2<'_, f32>, relations: &[usize]) -> Result<Array2<f32>> {
        let p = self.params()?;
        let mut out = Array2::zeros((rows.nrows(), self.config.rel_hidden_size));
        for ((row, &r), mut dst) in rows.rows().into_iter().zip(relations).zip(out.rows_mut()) {
            dst.assign(&row.dot(&p.matrices.index_axis(Axis(0), r)));
        }
        Ok(out)
    }

    /// Every entity projected into every example's relation space: `[b, N, d]`.
    fn project_all_entities(&self, relations: &[usize]) -> Result<Array3<f32>> {
        let p = self.params()?;
        let (k, d) = (self.config.ent_hidden_size, self.config.rel_hidden_size);
        let b = relations.len();
        let n = self.stats.num_entities;

        let stacked = p.matrices.select(Axis(0), relations).permuted_axes([0, 2, 1]);
        let stacked = Array2::from_shape_vec((b * d, k), stacked.iter().copied().collect())?;

        let entities = l2_normalize(p.entities.view(), Axis(1));
        let projected = entities.dot(&stacked.t());
        let projected = Array3::from_shape_vec((n, b, d), projected.iter().copied().collect())?;
        Ok(projected.permuted_axes([1, 0, 2]))
    }

    fn distances(&self, batch: &TripleBatch) -> Result<Array1<f32>> {
        let emb = self.embed(batch)?;
        self.dissimilarity(
            emb.heads.view(),
            emb.relations.view(),
            emb.tails.view(),
            Axis(1),
        )
    }

    fn shapes(&self) -> (Dim<[usize; 2]>, Dim<[usize; 2]>, Dim<[usize; 3]>) {
        let (k, d) = (self.config.ent_hidden_size, self.config.rel_hidden_size);
        let (n_e, n_r) = (self.stats.num_entities, self.stats.num_relations);
        (Dim([n_e, k]), Dim([n_r, d]), Dim([n_r, k, d]))
    }
}

impl KgeModel for TransR {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn statistics(&self) -> &KgStatistics {
        &self.stats
    }

    fn is_ready(&self) -> bool {
        self.params.is_some()
    }

    fn define_parameters(&mut self, _source: &dyn TripleSource) -> Result<()> {
        if self.params.is_some() {
            return Err(Error::AlreadyInitialized { model: NAME });
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let init = VarianceScaling::glorot_normal();
        let (ent_shape, rel_shape, mat_shape) = self.shapes();
        let entities = init.sample(ent_shape, &mut rng);
        let relations = init.sample(rel_shape, &mut rng);
        let matrices = init.sample(mat_shape, &mut rng);

        info!(
            model = NAME,
            entities = self.stats.num_entities,
            relations = self.stats.num_relations,
            k = self.config.ent_hidden_size,
            d = self.config.rel_hidden_size,
            "defined parameters"
        );
        self.params = Some(Params {
            entities,
            relations,
            matrices,
        });
        Ok(())
    }

    fn embed(&self, batch: &TripleBatch) -> Result<Embeddings> {
        let p = self.params()?;
        batch.validate(&self.stats)?;

        let heads = l2_normalize(gather_rows(p.entities.view(), &batch.heads).view(), Axis(1));
        let relations = l2_normalize(
            gather_rows(p.relations.view(), &batch.relations).view(),
            Axis(1),
        );
        let tails = l2_normalize(gather_rows(p.entities.view(), &batch.tails).view(), Axis(1));

        Ok(Embeddings {
            heads: self.project(heads.view(), &batch.relations)?,
            relations,
            tails: self.project(tails.view(), &batch.relations)?,
        })
    }

    fn loss(&self, positive: &TripleBatch, negative: &TripleBatch) -> Result<f32> {
        let pos = self.distances(positive)?;
        let neg = self.distances(negative)?;
        pairwise_margin_loss(
            pos.view(),
            neg.view(),
            self.config.margin,
            self.config.loss_reduction,
        )
    }

    fn predict(&self, batch: &TripleBatch, topk: Option<usize>) -> Result<Vec<usize>> {
        let batch = batch.broadcast()?;
        let dist = self.distances(&batch)?;
        select_topk(argsort(dist.view()), topk)
    }

    fn test_batch(&self, batch: &TripleBatch) -> Result<Rankings> {
        let emb = self.embed(batch)?;
        let candidates = self.project_all_entities(&batch.relations)?;

        let heads = emb.heads.view().insert_axis(Axis(1));
        let relations = emb.relations.view().insert_axis(Axis(1));
        let tails = emb.tails.view().insert_axis(Axis(1));
        debug!(
            model = NAME,
            batch = batch.len(),
            candidates = ?candidates.shape(),
            "scoring candidates"
        );

        let score_head = self.dissimilarity(candidates.view(), relations, tails, Axis(2))?;
        let score_tail = self.dissimilarity(heads, relations, candidates.view(), Axis(2))?;

        Ok(Rankings {
            head: argsort_rows(score_head.view()),
            tail: argsort_rows(score_tail.view()),
        })
    }

    fn parameters(&self) -> Result<Vec<Parameter>> {
        let p = self.params()?;
        Ok(vec![
            Parameter::from_array(ENTITY_EMBEDDINGS, &p.entities, true),
            Parameter::from_array(RELATION_EMBEDDINGS, &p.relations, true),
            Parameter::from_array(RELATION_MATRICES, &p.matrices, true),
        ])
    }

    fn load_parameters(&mut self, mut parameters: Vec<Parameter>) -> Result<()> {
        if self.params.is_some() {
            return Err(Error::AlreadyInitialized { model: NAME });
        }

        let (ent_shape, rel_shape, mat_shape) = self.shapes();
        let entities =
            take_parameter(&mut parameters, ENTITY_EMBEDDINGS)?.to_array::<Ix2>(ent_shape)?;
        let relations =
            take_parameter(&mut parameters, RELATION_EMBEDDINGS)?.to_array::<Ix2>(rel_shape)?;
        let matrices =
            take_parameter(&mut parameters, RELATION_MATRICES)?.to_array::<Ix3>(mat_shape)?;

        if let Some(extra) = parameters.first() {
            return Err(Error::UnknownParameter(extra.name.clone()));
        }

        debug!(model = NAME, "restored parameters");
        self.params = Some(Params {
            entities,
            relations,
            matrices,
        });
        Ok(())
    }

    fn parameter_mut(&mut self, name: &str) -> Result<ArrayViewMutD<'_, f32>> {
        let p = self
            .params
            .as_mut()
            .ok_or(Error::NotInitialized { model: NAME })?;
        match name {
            ENTITY_EMBEDDINGS => Ok(p.entities.view_mut().into_dyn()),
            RELATION_EMBEDDINGS => Ok(p.relations.view_mut().into_dyn()),
            RELATION_MATRICES => Ok(p.matrices.view_mut().into_dyn()),
            other => Err(Error::UnknownParameter(other.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Triple;
    use ndarray::{array, Array3};

    fn config(k: usize, d: usize) -> ModelConfig {
        ModelConfig::default()
            .with_ent_hidden_size(k)
            .with_rel_hidden_size(d)
            .with_seed(11)
    }

    fn ready_model(k: usize, d: usize, n_e: usize, n_r: usize) -> TransR {
        let mut model = TransR::new(config(k, d), KgStatistics::new(n_e, n_r)).unwrap();
        model.define_parameters(&Vec::<Triple>::new()).unwrap();
        model
    }

    /// Model with hand-written tables.
    fn fixed_model(entities: Array2<f32>, relations: Array2<f32>, matrices: Array3<f32>) -> TransR {
        let (n_e, k) = entities.dim();
        let (n_r, d) = relations.dim();
        let mut model = TransR::new(config(k, d), KgStatistics::new(n_e, n_r)).unwrap();
        model
            .load_parameters(vec![
                Parameter::from_array("entity_embeddings", &entities, true),
                Parameter::from_array("relation_embeddings", &relations, true),
                Parameter::from_array("relation_matrices", &matrices, true),
            ])
            .unwrap();
        model
    }

    #[test]
    fn test_transr_creation() {
        let model = TransR::new(config(4, 3), KgStatistics::new(6, 2)).unwrap();
        assert_eq!(model.name(), "TransR");
        assert!(!model.is_ready());
        assert!(matches!(
            model.embed(&TripleBatch::single(0, 0, 1)),
            Err(Error::NotInitialized { model: "TransR" })
        ));
        assert!(matches!(
            model.parameters(),
            Err(Error::NotInitialized { .. })
        ));
    }

    #[test]
    fn test_parameter_shapes() {
        let model = ready_model(4, 3, 6, 2);
        let params = model.parameters().unwrap();
        let shapes: Vec<_> = params.iter().map(|p| p.shape.clone()).collect();
        assert_eq!(shapes, vec![vec![6, 4], vec![2, 3], vec![2, 4, 3]]);
        assert!(params.iter().all(|p| p.trainable));
    }

    #[test]
    fn test_identity_projection_keeps_normalized_input() {
        let entities = array![[3.0f32, 4.0], [1.0, 0.0], [0.0, 2.0]];
        let relations = array![[1.0f32, 1.0], [0.0, 1.0]];
        let mut matrices = Array3::zeros((2, 2, 2));
        for r in 0..2 {
            matrices[[r, 0, 0]] = 1.0;
            matrices[[r, 1, 1]] = 1.0;
        }
        let model = fixed_model(entities, relations, matrices);

        let emb = model.embed(&TripleBatch::single(0, 0, 2)).unwrap();
        assert!((emb.heads[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((emb.heads[[0, 1]] - 0.8).abs() < 1e-6);
        assert!((emb.tails[[0, 0]]).abs() < 1e-6);
        assert!((emb.tails[[0, 1]] - 1.0).abs() < 1e-6);
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!((emb.relations[[0, 0]] - s).abs() < 1e-6);
    }

    #[test]
    fn test_projection_is_matrix_multiply() {
        let entities = array![[3.0f32, 4.0], [1.0, 0.0]];
        let relations = array![[1.0f32, 0.0]];
        // M = [[1, 2], [3, 4]]
        let matrices = Array3::from_shape_vec((1, 2, 2), vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let model = fixed_model(entities, relations, matrices);

        let emb = model.embed(&TripleBatch::single(0, 0, 1)).unwrap();
        // (0.6, 0.8) · M = (0.6 + 2.4, 1.2 + 3.2)
        assert!((emb.heads[[0, 0]] - 3.0).abs() < 1e-5);
        assert!((emb.heads[[0, 1]] - 4.4).abs() < 1e-5);
        // (1, 0) · M = first row
        assert!((emb.tails[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((emb.tails[[0, 1]] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_projection_changes_dimension() {
        let model = ready_model(5, 2, 4, 3);
        let emb = model
            .embed(&TripleBatch::new(vec![0, 1], vec![2, 0], vec![3, 3]))
            .unwrap();
        assert_eq!(emb.heads.shape(), &[2, 2]);
        assert_eq!(emb.relations.shape(), &[2, 2]);
        assert_eq!(emb.tails.shape(), &[2, 2]);
    }

    #[test]
    fn test_dissimilarity_training_axis() {
        let model = ready_model(3, 3, 4, 1);
        let h = array![[1.0f32, 0.0, 0.0]];
        let r = array![[0.0f32, 1.0, 0.0]];
        let t = array![[1.0f32, 1.0, 0.0]];
        let d = model
            .dissimilarity(h.view(), r.view(), t.view(), Axis(1))
            .unwrap();
        // L1 default: |1 - 1/√2| * 2
        let expected = 2.0 * (1.0 - std::f32::consts::FRAC_1_SQRT_2);
        assert!((d[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_batched_projection_matches_per_example() {
        let model = ready_model(4, 3, 7, 3);
        let relations = [2usize, 0, 2, 1];
        let all = model.project_all_entities(&relations).unwrap();
        assert_eq!(all.shape(), &[4, 7, 3]);

        let p = model.params().unwrap();
        let entities = l2_normalize(p.entities.view(), Axis(1));
        for (i, &r) in relations.iter().enumerate() {
            let ids = vec![r; 7];
            let expected = model.project(entities.view(), &ids).unwrap();
            for e in 0..7 {
                for j in 0..3 {
                    assert!((all[[i, e, j]] - expected[[e, j]]).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_test_batch_permutations() {
        let model = ready_model(4, 3, 6, 2);
        let batch = TripleBatch::new(vec![0, 5, 2], vec![1, 0, 1], vec![3, 1, 4]);
        let rankings = model.test_batch(&batch).unwrap();
        assert_eq!(rankings.head.shape(), &[3, 6]);
        for row in rankings.head.rows().into_iter().chain(rankings.tail.rows()) {
            let mut ids = row.to_vec();
            ids.sort_unstable();
            assert_eq!(ids, (0..6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_test_batch_agrees_with_predict() {
        let model = ready_model(4, 3, 6, 2);
        let batch = TripleBatch::new(vec![1, 0, 5], vec![1, 0, 1], vec![4, 2, 3]);
        let rankings = model.test_batch(&batch).unwrap();

        for (i, t) in batch.iter().enumerate() {
            let tails = model
                .predict(
                    &TripleBatch::new(vec![t.head], vec![t.relation], (0..6).collect()),
                    None,
                )
                .unwrap();
            let heads = model
                .predict(
                    &TripleBatch::new((0..6).collect(), vec![t.relation], vec![t.tail]),
                    None,
                )
                .unwrap();
            assert_eq!(rankings.tail.row(i).to_vec(), tails, "tail row {i}");
            assert_eq!(rankings.head.row(i).to_vec(), heads, "head row {i}");
        }
    }

    #[test]
    fn test_predict_topk() {
        let model = ready_model(4, 3, 6, 2);
        let batch = TripleBatch::new(vec![0], vec![0], (0..6).collect());
        assert_eq!(model.predict(&batch, Some(3)).unwrap().len(), 3);
        assert!(model.predict(&batch, Some(7)).is_err());
    }

    #[test]
    fn test_loss_zero_when_separated() {
        // positive residual ≈ 0.59, negative ≈ 2.0 under L1
        let entities = array![[1.0f32, 0.0], [0.0, 1.0], [-1.0, 0.0]];
        let relations = array![[-1.0f32, 1.0]];
        let matrices = Array3::from_shape_vec((1, 2, 2), vec![1.0f32, 0.0, 0.0, 1.0]).unwrap();
        let model = fixed_model(entities, relations, matrices);
        let pos = TripleBatch::single(0, 0, 1);
        let neg = TripleBatch::single(1, 0, 2);
        let pos_d = model.distances(&pos).unwrap()[0];
        let neg_d = model.distances(&neg).unwrap()[0];
        assert!(neg_d - pos_d >= model.config().margin);
        assert_eq!(model.loss(&pos, &neg).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_parameter_on_load() {
        let model = ready_model(2, 2, 3, 1);
        let mut params = model.parameters().unwrap();
        params.retain(|p| p.name != "relation_matrices");
        let mut other = TransR::new(config(2, 2), KgStatistics::new(3, 1)).unwrap();
        assert!(matches!(
            other.load_parameters(params),
            Err(Error::Validation(msg)) if msg.contains("relation_matrices")
        ));
        assert!(!other.is_ready());
    }

    #[test]
    fn test_unknown_parameter_on_load() {
        let model = ready_model(2, 2, 3, 1);
        let mut params = model.parameters().unwrap();
        params.push(Parameter::from_array("theta", &array![1.0f32], false));
        let mut other = TransR::new(config(2, 2), KgStatistics::new(3, 1)).unwrap();
        assert!(matches!(
            other.load_parameters(params),
            Err(Error::UnknownParameter(_))
        ));
    }
}
