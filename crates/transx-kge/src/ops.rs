//! Array primitives shared by the models.

use crate::error::{Error, Result};
use ndarray::{Array, Array2, ArrayView, ArrayView1, ArrayView2, Axis, Dimension};
use std::cmp::Ordering;

/// Floor on the squared norm, so zero vectors normalize to zero.
const L2_EPSILON: f32 = 1e-12;

/// Rows of `table` at `ids`. Ids must already be validated.
pub fn gather_rows(table: ArrayView2<'_, f32>, ids: &[usize]) -> Array2<f32> {
    table.select(Axis(0), ids)
}

/// Divide every lane along `axis` by its L2 norm.
pub fn l2_normalize<D: Dimension>(a: ArrayView<'_, f32, D>, axis: Axis) -> Array<f32, D> {
    let mut out = a.to_owned();
    for mut lane in out.lanes_mut(axis) {
        let sq: f32 = lane.iter().map(|x| x * x).sum();
        let inv = 1.0 / sq.max(L2_EPSILON).sqrt();
        lane.mapv_inplace(|x| x * inv);
    }
    out
}

/// Broadcast shape of two operands, right-aligned.
pub fn broadcast_shape(a: &[usize], b: &[usize], context: &'static str) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0; ndim];
    for i in 0..ndim {
        let da = if i + a.len() >= ndim { a[i + a.len() - ndim] } else { 1 };
        let db = if i + b.len() >= ndim { b[i + b.len() - ndim] } else { 1 };
        out[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(Error::ShapeMismatch {
                    context,
                    expected: a.to_vec(),
                    found: b.to_vec(),
                })
            }
        };
    }
    Ok(out)
}

/// Indices of `scores` in ascending order. Ties keep the lower index first.
pub fn argsort(scores: ArrayView1<'_, f32>) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..scores.len()).collect();
    idx.sort_by(|&a, &b| ascending(scores[a], scores[b]));
    idx
}

/// Row-wise [`argsort`].
pub fn argsort_rows(scores: ArrayView2<'_, f32>) -> Array2<usize> {
    let mut out = Array2::zeros(scores.raw_dim());
    for (row, mut dst) in scores.rows().into_iter().zip(out.rows_mut()) {
        for (slot, i) in dst.iter_mut().zip(argsort(row)) {
            *slot = i;
        }
    }
    out
}

/// NaN sorts last.
fn ascending(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}
