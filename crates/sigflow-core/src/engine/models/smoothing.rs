//! Symmetric diffusion ("Gaussian smoothing") over signed links.
//!
//! The diagonal of `W` is split off as self-loops `d`; the remaining links
//! `Wn` are symmetrized into `W_ot = Wn + Wnᵀ`, and every node gets a degree
//! term `deg = Ds + D_in + D_out` where `Ds = (1 - sign(d))² |d|` is the
//! self-loop contribution. The steady state solves
//!
//! ```text
//! (α (diag(deg) - W_ot) + (1-α) I) x = (1-α) b
//! ```
//!
//! and the fixed-point form is `x' = Dc (α W_ot x + (1-α) b)` with
//! `Dc = diag(1 / (α deg + 1 - α))`.

use nalgebra::{DMatrix, DVector};

use crate::engine::errors::SingularSystem;
use crate::engine::solver::{invert, sign, IterativeOperator, PropagationModel};
use crate::engine::weights::{in_degree, out_degree};

/// Symmetrized link matrix and per-node degree term.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionTerms {
    pub w_ot: DMatrix<f64>,
    pub degree: DVector<f64>,
}

impl DiffusionTerms {
    fn exact_operator(&self, alpha: f64) -> Result<DMatrix<f64>, SingularSystem> {
        let n = self.degree.len();
        let m0 = (DMatrix::from_diagonal(&self.degree) - &self.w_ot) * alpha
            + DMatrix::identity(n, n) * (1.0 - alpha);
        Ok(invert(m0)? * (1.0 - alpha))
    }

    fn iterative_operator(&self, alpha: f64) -> IterativeOperator {
        let dc = self.degree.map(|d| 1.0 / (alpha * d + (1.0 - alpha)));
        let mut transition = &self.w_ot * alpha;
        for (i, mut row) in transition.row_iter_mut().enumerate() {
            row *= dc[i];
        }
        IterativeOperator {
            transition,
            input_gain: dc * (1.0 - alpha),
        }
    }
}

fn split_self_loops(w: &DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let d = w.diagonal();
    let mut wn = w.clone();
    wn.fill_diagonal(0.0);
    (wn, d)
}

fn self_loop_effect(d: f64) -> f64 {
    (1.0 - sign(d)).powi(2) * d.abs()
}

/// Terms of the unnormalized diffusion.
pub fn diffusion_terms(w: &DMatrix<f64>) -> DiffusionTerms {
    let (wn, d) = split_self_loops(w);
    let d_in = in_degree(&wn);
    let d_out = out_degree(&wn);
    let degree = DVector::from_fn(d.len(), |i, _| self_loop_effect(d[i]) + d_in[i] + d_out[i]);
    DiffusionTerms {
        w_ot: &wn + wn.transpose(),
        degree,
    }
}

/// Terms of the degree-normalized diffusion: links are scaled by
/// `1/sqrt(in_i)` and `1/sqrt(out_j)`, the self-loop term by `1/(in + out)`,
/// and the degree contributions collapse to `sign(in) + sign(out)`.
pub fn normalized_diffusion_terms(w: &DMatrix<f64>) -> DiffusionTerms {
    let (mut wn, d) = split_self_loops(w);
    let d_in = in_degree(&wn);
    let d_out = out_degree(&wn);

    let pad_sqrt = |v: f64| if v == 0.0 { 1.0 } else { v.sqrt() };
    let sqrt_in = d_in.map(pad_sqrt);
    let sqrt_out = d_out.map(pad_sqrt);
    let nrows = wn.nrows();
    for (k, v) in wn.iter_mut().enumerate() {
        *v /= sqrt_in[k % nrows] * sqrt_out[k / nrows];
    }

    let degree = DVector::from_fn(d.len(), |i, _| {
        let total = d_in[i] + d_out[i];
        let inv_total = if total == 0.0 { 1.0 } else { 1.0 / total };
        self_loop_effect(d[i]) * inv_total + sign(d_in[i]) + sign(d_out[i])
    });

    DiffusionTerms {
        w_ot: &wn + wn.transpose(),
        degree,
    }
}

/// Gaussian smoothing (`GS`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianSmoothing;

impl PropagationModel for GaussianSmoothing {
    fn abbr(&self) -> &'static str {
        "GS"
    }

    fn name(&self) -> &'static str {
        "Gaussian smoothing algorithm"
    }

    fn prepare_exact(
        &self,
        w: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<DMatrix<f64>, SingularSystem> {
        diffusion_terms(w).exact_operator(alpha)
    }

    fn prepare_iterative(&self, w: &DMatrix<f64>, alpha: f64) -> IterativeOperator {
        diffusion_terms(w).iterative_operator(alpha)
    }
}

/// Normalized Gaussian smoothing (`NGS`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedGaussianSmoothing;

impl PropagationModel for NormalizedGaussianSmoothing {
    fn abbr(&self) -> &'static str {
        "NGS"
    }

    fn name(&self) -> &'static str {
        "Normalized gaussian smoothing algorithm"
    }

    fn prepare_exact(
        &self,
        w: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<DMatrix<f64>, SingularSystem> {
        normalized_diffusion_terms(w).exact_operator(alpha)
    }

    fn prepare_iterative(&self, w: &DMatrix<f64>, alpha: f64) -> IterativeOperator {
        normalized_diffusion_terms(w).iterative_operator(alpha)
    }
}
