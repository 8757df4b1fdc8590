//! Translation distances.
//!
//! Both models score a triple by how far `h + r` lands from `t`:
//!
//! | Norm | Distance |
//! |------|----------|
//! | L1 | Σ \|h + r − t\| |
//! | L2 | Σ (h + r − t)² |
//!
//! Lower distance = more plausible. The squared L2 form is used as-is
//! (no square root), matching the training objective.
//!
//! The functions are generic over array rank so the same code serves
//! per-example scoring (`[batch, dim]`, reduce over axis 1) and broadcast
//! candidate scoring (`[batch, 1, dim]` against `[1, entities, dim]`,
//! reduce over axis 2).

use crate::error::{Error, Result};
use crate::ops::{broadcast_shape, l2_normalize};
use ndarray::{Array, ArrayView, Axis, DimMax, Dimension, RemoveAxis};
use serde::{Deserialize, Serialize};

/// Distance norm selected by the `l1_flag` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    /// Sum of absolute residuals.
    L1,
    /// Sum of squared residuals.
    L2,
}

impl Norm {
    pub fn from_l1_flag(l1_flag: bool) -> Self {
        if l1_flag {
            Self::L1
        } else {
            Self::L2
        }
    }

    /// Per-component contribution of a residual.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::L1 => x.abs(),
            Self::L2 => x * x,
        }
    }
}

/// `reduce_sum(norm(h + r − t), axis)` with broadcasting across operands.
pub fn translation_distance<D>(
    h: ArrayView<'_, f32, D>,
    r: ArrayView<'_, f32, D>,
    t: ArrayView<'_, f32, D>,
    axis: Axis,
    norm: Norm,
) -> Result<Array<f32, D::Smaller>>
where
    D: Dimension + RemoveAxis + DimMax<D, Output = D>,
{
    let shape = broadcast_shape(h.shape(), r.shape(), "distance operands")?;
    let shape = broadcast_shape(&shape, t.shape(), "distance operands")?;
    if axis.index() >= shape.len() {
        return Err(Error::Validation(format!(
            "reduction axis {} out of range for rank {}",
            axis.index(),
            shape.len()
        )));
    }

    let mut residual = &(&h + &r) - &t;
    residual.mapv_inplace(|x| norm.apply(x));
    Ok(residual.sum_axis(axis))
}

/// Normalize each operand along `axis`, then [`translation_distance`].
///
/// Re-normalizing an already unit-length operand is a no-op, so this is safe
/// to call on embeddings that were normalized before projection.
pub fn dissimilarity<D>(
    h: ArrayView<'_, f32, D>,
    r: ArrayView<'_, f32, D>,
    t: ArrayView<'_, f32, D>,
    axis: Axis,
    norm: Norm,
) -> Result<Array<f32, D::Smaller>>
where
    D: Dimension + RemoveAxis + DimMax<D, Output = D>,
{
    let ndim = h.ndim();
    if axis.index() >= ndim {
        return Err(Error::Validation(format!(
            "normalization axis {} out of range for rank {}",
            axis.index(),
            ndim
        )));
    }
    let h = l2_normalize(h, axis);
    let r = l2_normalize(r, axis);
    let t = l2_normalize(t, axis);
    translation_distance(h.view(), r.view(), t.view(), axis, norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_l1_distance() {
        let h = array![[1.0f32, 0.0], [0.5, 0.5]];
        let r = array![[0.0f32, 1.0], [0.0, 0.0]];
        let t = array![[1.0f32, 0.0], [0.0, 1.0]];
        let d = translation_distance(h.view(), r.view(), t.view(), Axis(1), Norm::L1).unwrap();
        // |0| + |1| , |0.5| + |-0.5|
        assert!((d[0] - 1.0).abs() < 1e-6);
        assert!((d[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_distance_is_squared() {
        let h = array![[1.0f32, 2.0]];
        let r = array![[1.0f32, 0.0]];
        let t = array![[0.0f32, 0.0]];
        let d = translation_distance(h.view(), r.view(), t.view(), Axis(1), Norm::L2).unwrap();
        assert!((d[0] - 8.0).abs() < 1e-6); // 2² + 2²
    }

    #[test]
    fn test_exact_translation_scores_zero() {
        let h = array![[0.2f32, 0.5]];
        let r = array![[0.3f32, 0.1]];
        let t = array![[0.5f32, 0.6]];
        for norm in [Norm::L1, Norm::L2] {
            let d = translation_distance(h.view(), r.view(), t.view(), Axis(1), norm).unwrap();
            assert!(d[0].abs() < 1e-6);
        }
    }

    #[test]
    fn test_broadcast_candidates() {
        // 2 examples, 3 candidate entities, dim 2
        let candidates = Array3::from_shape_vec(
            (1, 3, 2),
            vec![1.0f32, 0.0, 0.0, 1.0, -1.0, 0.0],
        )
        .unwrap();
        let r = Array3::from_shape_vec((2, 1, 2), vec![0.0f32, 0.0, 0.0, 0.0]).unwrap();
        let t = Array3::from_shape_vec((2, 1, 2), vec![1.0f32, 0.0, 0.0, 1.0]).unwrap();
        let d = translation_distance(candidates.view(), r.view(), t.view(), Axis(2), Norm::L1)
            .unwrap();
        assert_eq!(d.shape(), &[2, 3]);
        assert!(d[[0, 0]].abs() < 1e-6);
        assert!(d[[1, 1]].abs() < 1e-6);
        assert!((d[[0, 2]] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let h = array![[1.0f32, 0.0], [0.0, 1.0]];
        let r = array![[1.0f32, 0.0, 0.0]];
        let t = array![[1.0f32, 0.0]];
        let err = translation_distance(h.view(), r.view(), t.view(), Axis(1), Norm::L1);
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_dissimilarity_normalizes_operands() {
        let h = array![[2.0f32, 0.0]];
        let r = array![[0.0f32, 5.0]];
        let t = array![[3.0f32, 3.0]];
        let d = dissimilarity(h.view(), r.view(), t.view(), Axis(1), Norm::L2).unwrap();
        // (1,0) + (0,1) - (1/√2, 1/√2)
        let c = 1.0 - std::f32::consts::FRAC_1_SQRT_2;
        assert!((d[0] - 2.0 * c * c).abs() < 1e-5);
    }

    #[test]
    fn test_norm_from_flag() {
        assert_eq!(Norm::from_l1_flag(true), Norm::L1);
        assert_eq!(Norm::from_l1_flag(false), Norm::L2);
    }
}
