//! TransM: translations weighted by relational mapping properties.
//!
//! TransM ([Fan et al. 2014](https://aclanthology.org/Y14-1039/)) keeps the
//! TransE hypothesis `h + r ≈ t` but scales each fact's distance by a
//! relation-specific weight:
//!
//! ```text
//! score(h, r, t) = θ_r · ||h + r − t||
//! θ_r = 1 / ln(2 + count_r / (1 + |tails_r|) + count_r / (1 + |heads_r|))
//! ```
//!
//! θ is computed once from the training set and frozen. Relations whose
//! triples fan out to many heads or tails (1-to-N, N-to-1, N-to-N) receive
//! a smaller weight, softening the penalty random corruption puts on them.
//!
//! # Training
//!
//! ```text
//! L = Σ max(0, θ_pos · d(pos) + margin − θ_neg · d(neg))
//! ```

use crate::config::ModelConfig;
use crate::data::{KgStatistics, Triple, TripleBatch, TripleSource};
use crate::error::{Error, Result};
use crate::init::VarianceScaling;
use crate::loss::pairwise_margin_loss;
use crate::model::{select_topk, take_parameter, Embeddings, KgeModel, Parameter, Rankings};
use crate::ops::{argsort, argsort_rows, gather_rows, l2_normalize};
use crate::scoring::{translation_distance, Norm};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMutD, Axis, Dim, Ix1, Ix2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

const NAME: &str = "TransM";

const ENTITY_EMBEDDINGS: &str = "entity_embeddings";
const RELATION_EMBEDDINGS: &str = "relation_embeddings";
const THETA: &str = "theta";

/// Occurrences of one relation in the training set.
///
/// Heads and tails are lists, not sets: a head appearing in three triples
/// is counted three times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMappingStats {
    pub count: usize,
    pub heads: Vec<usize>,
    pub tails: Vec<usize>,
}

impl RelationMappingStats {
    /// Per-relation statistics for every relation id in `stats`.
    pub fn collect(triples: &[Triple], stats: &KgStatistics) -> Result<Vec<Self>> {
        let mut out = vec![Self::default(); stats.num_relations];
        for t in triples {
            stats.check_relation(t.relation)?;
            stats.check_entity(t.head)?;
            stats.check_entity(t.tail)?;
            let entry = &mut out[t.relation];
            entry.heads.push(t.head);
            entry.tails.push(t.tail);
            entry.count += 1;
        }
        Ok(out)
    }

    /// θ for this relation. The `+1` and `2+` offsets keep unseen
    /// relations finite (θ = 1 / ln 2).
    pub fn theta(&self) -> f64 {
        let count = self.count as f64;
        let arg = 2.0
            + count / (1.0 + self.tails.len() as f64)
            + count / (1.0 + self.heads.len() as f64);
        1.0 / arg.ln()
    }
}

/// Frozen per-relation weights θ.
///
/// Built once during parameter definition (or restored from a checkpoint);
/// there is no way to mutate the contents afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationWeights(Array1<f32>);

impl RelationWeights {
    pub fn from_stats(mapping: &[RelationMappingStats]) -> Self {
        Self(mapping.iter().map(|m| m.theta() as f32).collect())
    }

    fn from_array(theta: Array1<f32>) -> Result<Self> {
        if let Some(bad) = theta.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
            return Err(Error::Validation(format!(
                "relation weights must be positive and finite, found {bad}"
            )));
        }
        Ok(Self(theta))
    }

    /// θ for relation `r`.
    pub fn get(&self, r: usize) -> Option<f32> {
        self.0.get(r).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.0.view()
    }

    /// θ looked up per example. Ids must already be validated.
    fn gather(&self, relations: &[usize]) -> Array1<f32> {
        relations.iter().map(|&r| self.0[r]).collect()
    }
}

#[derive(Debug, Clone)]
struct Params {
    entities: Array2<f32>,
    relations: Array2<f32>,
    theta: RelationWeights,
}

/// TransM model.
#[derive(Debug, Clone)]
pub struct TransM {
    config: ModelConfig,
    stats: KgStatistics,
    norm: Norm,
    params: Option<Params>,
}

impl TransM {
    /// Create an uninitialized model. Uses `ent_hidden_size` for both tables.
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

    /// The frozen relation weights.
    pub fn theta(&self) -> Result<&RelationWeights> {
        Ok(&self.params()?.theta)
    }

    /// Translation distance per row, reduced over the embedding axis.
    pub fn distance(
        &self,
        h: ArrayView2<'_, f32>,
        r: ArrayView2<'_, f32>,
        t: ArrayView2<'_, f32>,
    ) -> Result<Array1<f32>> {
        translation_distance(h, r, t, Axis(1), self.norm)
    }

    /// θ-weighted distance of a batch.
    fn weighted_scores(&self, batch: &TripleBatch) -> Result<Array1<f32>> {
        let emb = self.embed(batch)?;
        let dist = self.distance(emb.heads.view(), emb.relations.view(), emb.tails.view())?;
        let theta = self.params()?.theta.gather(&batch.relations);
        Ok(theta * dist)
    }

    fn table_shapes(&self) -> (Dim<[usize; 2]>, Dim<[usize; 2]>) {
        let k = self.config.ent_hidden_size;
        (
            Dim([self.stats.num_entities, k]),
            Dim([self.stats.num_relations, k]),
        )
    }
}

impl KgeModel for TransM {
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

    fn define_parameters(&mut self, source: &dyn TripleSource) -> Result<()> {
        if self.params.is_some() {
            return Err(Error::AlreadyInitialized { model: NAME });
        }

        let triples = source.training_triples()?;
        let mapping = RelationMappingStats::collect(&triples, &self.stats)?;
        let unseen = mapping.iter().filter(|m| m.count == 0).count();
        if unseen > 0 {
            warn!(
                model = NAME,
                unseen, "relations without training triples get weight 1/ln 2"
            );
        }
        let theta = RelationWeights::from_stats(&mapping);
        debug!(model = NAME, relations = theta.len(), "computed relation weights");

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let init = VarianceScaling::xavier_normal();
        let (ent_shape, rel_shape) = self.table_shapes();
        let entities = init.sample(ent_shape, &mut rng);
        let relations = init.sample(rel_shape, &mut rng);

        info!(
            model = NAME,
            entities = self.stats.num_entities,
            relations = self.stats.num_relations,
            dim = self.config.ent_hidden_size,
            triples = triples.len(),
            "defined parameters"
        );
        self.params = Some(Params {
            entities,
            relations,
            theta,
        });
        Ok(())
    }

    fn embed(&self, batch: &TripleBatch) -> Result<Embeddings> {
        let p = self.params()?;
        batch.validate(&self.stats)?;

        let entities = l2_normalize(p.entities.view(), Axis(1));
        let relations = l2_normalize(p.relations.view(), Axis(1));
        Ok(Embeddings {
            heads: gather_rows(entities.view(), &batch.heads),
            relations: gather_rows(relations.view(), &batch.relations),
            tails: gather_rows(entities.view(), &batch.tails),
        })
    }

    fn loss(&self, positive: &TripleBatch, negative: &TripleBatch) -> Result<f32> {
        let pos = self.weighted_scores(positive)?;
        let neg = self.weighted_scores(negative)?;
        pairwise_margin_loss(
            pos.view(),
            neg.view(),
            self.config.margin,
            self.config.loss_reduction,
        )
    }

    fn predict(&self, batch: &TripleBatch, topk: Option<usize>) -> Result<Vec<usize>> {
        let batch = batch.broadcast()?;
        let emb = self.embed(&batch)?;
        let dist = self.distance(emb.heads.view(), emb.relations.view(), emb.tails.view())?;
        select_topk(argsort(dist.view()), topk)
    }

    fn test_batch(&self, batch: &TripleBatch) -> Result<Rankings> {
        let emb = self.embed(batch)?;
        let p = self.params()?;

        // [1, N, k] candidates against [b, 1, k] fixed operands
        let entities = l2_normalize(p.entities.view(), Axis(1));
        let candidates = entities.view().insert_axis(Axis(0));
        let heads = emb.heads.view().insert_axis(Axis(1));
        let relations = emb.relations.view().insert_axis(Axis(1));
        let tails = emb.tails.view().insert_axis(Axis(1));

        let score_head = translation_distance(candidates, relations, tails, Axis(2), self.norm)?;
        let score_tail = translation_distance(heads, relations, candidates, Axis(2), self.norm)?;

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
            Parameter::from_array(THETA, &p.theta.0, false),
        ])
    }

    fn load_parameters(&mut self, mut parameters: Vec<Parameter>) -> Result<()> {
        if self.params.is_some() {
            return Err(Error::AlreadyInitialized { model: NAME });
        }

        let (ent_shape, rel_shape) = self.table_shapes();
        let entities: Array2<f32> =
            take_parameter(&mut parameters, ENTITY_EMBEDDINGS)?.to_array::<Ix2>(ent_shape)?;
        let relations: Array2<f32> =
            take_parameter(&mut parameters, RELATION_EMBEDDINGS)?.to_array::<Ix2>(rel_shape)?;
        let theta = take_parameter(&mut parameters, THETA)?
            .to_array::<Ix1>(Dim([self.stats.num_relations]))?;
        let theta = RelationWeights::from_array(theta)?;

        if let Some(extra) = parameters.first() {
            return Err(Error::UnknownParameter(extra.name.clone()));
        }

        debug!(model = NAME, "restored parameters");
        self.params = Some(Params {
            entities,
            relations,
            theta,
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
            THETA => Err(Error::FrozenParameter(THETA.into())),
            other => Err(Error::UnknownParameter(other.into())),
        }
    }
}
