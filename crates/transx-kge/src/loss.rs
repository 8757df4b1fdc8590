//! Margin-based ranking loss.
//!
//! ```text
//! L = reduce( max(0, margin + d(pos) − d(neg)) )
//! ```
//!
//! where `d` is a distance (lower = more plausible). A pair contributes
//! nothing once the corrupted triple is at least `margin` further away than
//! the true one.

use crate::error::{Error, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Aggregation of per-example hinge terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
}

/// `reduce(max(0, margin + positive − negative))` over paired scores.
pub fn pairwise_margin_loss(
    positive: ArrayView1<'_, f32>,
    negative: ArrayView1<'_, f32>,
    margin: f32,
    reduction: Reduction,
) -> Result<f32> {
    if positive.len() != negative.len() {
        return Err(Error::ShapeMismatch {
            context: "margin loss",
            expected: vec![positive.len()],
            found: vec![negative.len()],
        });
    }

    let total: f32 = positive
        .iter()
        .zip(negative.iter())
        .map(|(&p, &n)| (margin + p - n).max(0.0))
        .sum();

    Ok(match reduction {
        Reduction::Sum => total,
        Reduction::Mean if positive.is_empty() => 0.0,
        Reduction::Mean => total / positive.len() as f32,
    })
}
