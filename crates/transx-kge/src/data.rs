//! Id-level triples, batches, and the training-data seam.
//!
//! Models never load datasets themselves. They see integer ids that index
//! into their entity and relation tables, supplied either as batches or,
//! once at parameter definition, as the full training set through
//! [`TripleSource`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `(head, relation, tail)` fact as table indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Head entity id.
    pub head: usize,
    /// Relation id.
    pub relation: usize,
    /// Tail entity id.
    pub tail: usize,
}

impl Triple {
    pub fn new(head: usize, relation: usize, tail: usize) -> Self {
        Self {
            head,
            relation,
            tail,
        }
    }
}

impl From<(usize, usize, usize)> for Triple {
    fn from((head, relation, tail): (usize, usize, usize)) -> Self {
        Self::new(head, relation, tail)
    }
}

/// Entity and relation counts of the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KgStatistics {
    /// Number of distinct entities.
    pub num_entities: usize,
    /// Number of distinct relations.
    pub num_relations: usize,
}

impl KgStatistics {
    pub fn new(num_entities: usize, num_relations: usize) -> Self {
        Self {
            num_entities,
            num_relations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_entities == 0 || self.num_relations == 0 {
            return Err(Error::Validation(format!(
                "knowledge graph needs at least one entity and one relation, got {} / {}",
                self.num_entities, self.num_relations
            )));
        }
        Ok(())
    }

    pub(crate) fn check_entity(&self, id: usize) -> Result<()> {
        if id >= self.num_entities {
            return Err(Error::IndexOutOfBounds {
                kind: "entity",
                index: id,
                bound: self.num_entities,
            });
        }
        Ok(())
    }

    pub(crate) fn check_relation(&self, id: usize) -> Result<()> {
        if id >= self.num_relations {
            return Err(Error::IndexOutOfBounds {
                kind: "relation",
                index: id,
                bound: self.num_relations,
            });
        }
        Ok(())
    }
}

/// Column-oriented batch of triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleBatch {
    pub heads: Vec<usize>,
    pub relations: Vec<usize>,
    pub tails: Vec<usize>,
}

impl TripleBatch {
    pub fn new(heads: Vec<usize>, relations: Vec<usize>, tails: Vec<usize>) -> Self {
        Self {
            heads,
            relations,
            tails,
        }
    }

    /// Batch of a single triple.
    pub fn single(head: usize, relation: usize, tail: usize) -> Self {
        Self::new(vec![head], vec![relation], vec![tail])
    }

    /// Length of the head column.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Require equal column lengths and in-range ids.
    pub fn validate(&self, stats: &KgStatistics) -> Result<()> {
        let n = self.heads.len();
        if self.relations.len() != n || self.tails.len() != n {
            return Err(Error::ShapeMismatch {
                context: "triple batch",
                expected: vec![n, n, n],
                found: vec![n, self.relations.len(), self.tails.len()],
            });
        }
        for &h in &self.heads {
            stats.check_entity(h)?;
        }
        for &t in &self.tails {
            stats.check_entity(t)?;
        }
        for &r in &self.relations {
            stats.check_relation(r)?;
        }
        Ok(())
    }

    /// Expand length-1 columns to the longest column.
    ///
    /// `heads = [0..N]` with a single relation and tail becomes N triples
    /// sharing that relation and tail. Columns of any other differing length
    /// are a shape mismatch.
    pub fn broadcast(&self) -> Result<Self> {
        let lens = [self.heads.len(), self.relations.len(), self.tails.len()];
        let n = lens.iter().copied().max().unwrap_or(0);
        if lens.iter().any(|&l| l != n && l != 1) {
            return Err(Error::ShapeMismatch {
                context: "triple batch broadcast",
                expected: vec![n, n, n],
                found: lens.to_vec(),
            });
        }
        let expand = |col: &[usize]| -> Vec<usize> {
            if col.len() == n {
                col.to_vec()
            } else {
                vec![col[0]; n]
            }
        };
        Ok(Self::new(
            expand(&self.heads),
            expand(&self.relations),
            expand(&self.tails),
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.heads
            .iter()
            .zip(&self.relations)
            .zip(&self.tails)
            .map(|((&h, &r), &t)| Triple::new(h, r, t))
    }
}

impl FromIterator<Triple> for TripleBatch {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut batch = Self::default();
        for t in iter {
            batch.heads.push(t.head);
            batch.relations.push(t.relation);
            batch.tails.push(t.tail);
        }
        batch
    }
}

impl From<&[Triple]> for TripleBatch {
    fn from(triples: &[Triple]) -> Self {
        triples.iter().copied().collect()
    }
}

/// Supplies the full training triple set.
pub trait TripleSource {
    /// All training triples, or `DataUnavailable` if they cannot be read.
    fn training_triples(&self) -> Result<Vec<Triple>>;
}

impl TripleSource for Vec<Triple> {
    fn training_triples(&self) -> Result<Vec<Triple>> {
        Ok(self.clone())
    }
}

/// Dataset split held by a [`TripleCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    Train,
    Valid,
    Test,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "triplets_train",
            Self::Valid => "triplets_valid",
            Self::Test => "triplets_test",
        }
    }
}

/// In-memory cache of dataset splits.
#[derive(Debug, Clone, Default)]
pub struct TripleCache {
    splits: HashMap<CacheKey, Vec<Triple>>,
}

impl TripleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a split, replacing any previous contents.
    pub fn insert(&mut self, key: CacheKey, triples: Vec<Triple>) {
        self.splits.insert(key, triples);
    }

    pub fn with_split(mut self, key: CacheKey, triples: Vec<Triple>) -> Self {
        self.insert(key, triples);
        self
    }

    /// Read a cached split.
    pub fn read(&self, key: CacheKey) -> Result<&[Triple]> {
        self.splits
            .get(&key)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::DataUnavailable(format!("no cached {}", key.as_str())))
    }
}

impl TripleSource for TripleCache {
    fn training_triples(&self) -> Result<Vec<Triple>> {
        self.read(CacheKey::Train).map(<[Triple]>::to_vec)
    }
}
