//! Weight matrix construction from a signed adjacency matrix.

use nalgebra::{DMatrix, DVector};

use crate::engine::errors::SignalFlowError;
use crate::engine::network::ensure_square;

/// Which degree sums divide the adjacency entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DegreeNorm {
    /// `A[i,j] / sqrt(in_i) / sqrt(out_j)`.
    #[default]
    Both,
    /// `A[i,j] / in_i` (row sums of `|A|`).
    In,
    /// `A[i,j] / out_j` (column sums of `|A|`).
    Out,
}

/// How a model turns the adjacency matrix into its weight matrix when
/// `apply_weight_norm` is off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightScheme {
    /// Use the adjacency matrix as is.
    Unit,
    /// Scale every link by a constant.
    Scaled(f64),
}

/// Absolute row sums (in-degree weight of each target).
pub fn in_degree(a: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        a.nrows(),
        a.row_iter().map(|row| row.iter().map(|v| v.abs()).sum::<f64>()),
    )
}

/// Absolute column sums (out-degree weight of each source).
pub fn out_degree(a: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        a.ncols(),
        a.column_iter()
            .map(|col| col.iter().map(|v| v.abs()).sum::<f64>()),
    )
}

fn safe_divisor(v: f64) -> f64 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

/// Degree-normalizes `a`. Zero degrees are replaced by 1.
pub fn normalize(a: &DMatrix<f64>, norm: DegreeNorm) -> Result<DMatrix<f64>, SignalFlowError> {
    ensure_square(a, "adjacency matrix")?;
    let d_in = in_degree(a).map(safe_divisor);
    let d_out = out_degree(a).map(safe_divisor);

    let mut w = a.clone();
    match norm {
        DegreeNorm::Both => {
            let sq_in = d_in.map(f64::sqrt);
            let sq_out = d_out.map(f64::sqrt);
            for ((i, j), v) in indexed_mut(&mut w) {
                *v /= sq_in[i] * sq_out[j];
            }
        }
        DegreeNorm::In => {
            for ((i, _), v) in indexed_mut(&mut w) {
                *v /= d_in[i];
            }
        }
        DegreeNorm::Out => {
            for ((_, j), v) in indexed_mut(&mut w) {
                *v /= d_out[j];
            }
        }
    }
    Ok(w)
}

/// Builds the weight matrix used by a propagation model.
///
/// With a `norm` the adjacency is degree-normalized; otherwise `scheme`
/// decides.
pub fn build_weight_matrix(
    a: &DMatrix<f64>,
    norm: Option<DegreeNorm>,
    scheme: WeightScheme,
) -> Result<DMatrix<f64>, SignalFlowError> {
    ensure_square(a, "adjacency matrix")?;
    if let Some(norm) = norm {
        return normalize(a, norm);
    }
    Ok(match scheme {
        WeightScheme::Unit => a.clone(),
        WeightScheme::Scaled(weight) => a * weight,
    })
}

/// Column-major `((row, col), &mut value)` iterator.
fn indexed_mut(m: &mut DMatrix<f64>) -> impl Iterator<Item = ((usize, usize), &mut f64)> {
    let nrows = m.nrows();
    m.iter_mut()
        .enumerate()
        .map(move |(k, v)| ((k % nrows, k / nrows), v))
}
