//! Influence matrices and single-perturbation analysis.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::engine::algorithm::SignalFlowAlgorithm;
use crate::engine::errors::SignalFlowError;
use crate::engine::perturbation::BasalOverrides;

/// Result of [`calc_influence`].
#[derive(Debug, Clone, PartialEq)]
pub struct Influence {
    /// `E[i, j]`: effect of node `j` on node `i` summed over all walks.
    pub matrix: DMatrix<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Effect matrix `E = Σ_{k≥1} (αW)^k`, i.e. the partial derivatives
/// `∂x_i/∂x_j` of the propagation update along every walk.
///
/// Iterates `E(t+1) = E(t)·αW + αW` from `E(0) = I` (or `initial`) until
/// `‖E(t+1) - E(t)‖_F < tol` or `max_iter` steps.
pub fn calc_influence(
    w: &DMatrix<f64>,
    alpha: f64,
    initial: Option<&DMatrix<f64>>,
    max_iter: usize,
    tol: f64,
) -> Result<Influence, SignalFlowError> {
    if w.nrows() != w.ncols() {
        return Err(SignalFlowError::dimension_mismatch(
            "weight matrix",
            "square matrix",
            format!("{}x{}", w.nrows(), w.ncols()),
        ));
    }
    if max_iter == 0 {
        return Err(SignalFlowError::invalid_parameter("max_iter", "should be greater than 0"));
    }
    let n = w.nrows();
    let mut e = match initial {
        Some(m) if m.shape() != w.shape() => {
            return Err(SignalFlowError::dimension_mismatch(
                "initial influence matrix",
                format!("{}x{}", n, n),
                format!("{}x{}", m.nrows(), m.ncols()),
            ))
        }
        Some(m) => m.clone(),
        None => DMatrix::identity(n, n),
    };

    let aw = w * alpha;
    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iter {
        let next = &e * &aw + &aw;
        iterations += 1;
        let delta = (&next - &e).norm();
        e = next;
        if delta < tol {
            converged = true;
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(iterations, converged, "influence matrix computed");

    if e.iter().any(|v| !v.is_finite()) {
        return Err(SignalFlowError::Numerical(
            "influence matrix diverged".into(),
        ));
    }
    Ok(Influence {
        matrix: e,
        iterations,
        converged,
    })
}

/// Activity and signal flow changes caused by one set of perturbations.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationAnalysis {
    /// `x_pert - x_ctrl`.
    pub activity_change: DVector<f64>,
    /// `F[i, j]`: change of the flow carried by link `j -> i`.
    pub signal_flow: DMatrix<f64>,
    /// Per-step difference of the perturbed and control trajectories.
    pub trajectory_change: Option<Vec<DVector<f64>>>,
}

/// `W ∘ x`: scales column `j` by `x[j]`, the flow leaving node `j`.
fn flow(w: &DMatrix<f64>, x: &DVector<f64>) -> DMatrix<f64> {
    let mut f = w.clone();
    for (j, mut col) in f.column_iter_mut().enumerate() {
        col *= x[j];
    }
    f
}

/// Pads the shorter trajectory with its final state.
fn pad_to(trajectory: &mut Vec<DVector<f64>>, len: usize) {
    if let Some(last) = trajectory.last().cloned() {
        trajectory.resize(len, last);
    }
}

/// Compares the iterative propagation of `b` with and without perturbing
/// `targets` on the algorithm's current weights.
///
/// Global inputs are applied to both runs. With link-type perturbations the
/// perturbed weights are installed for the perturbed run only; the
/// algorithm's weights, solver cache and batch result are left untouched.
pub fn analyze_perturbation(
    alg: &mut dyn SignalFlowAlgorithm,
    targets: &[Arc<str>],
    b: Option<&DVector<f64>>,
    record_trajectory: bool,
) -> Result<PerturbationAnalysis, SignalFlowError> {
    let data = alg
        .data()
        .cloned()
        .ok_or(SignalFlowError::NotInitialized("data"))?;
    let n = data.network().len();
    let b = match b {
        Some(b) if b.len() != n => {
            return Err(SignalFlowError::dimension_mismatch("basal activity", n, b.len()))
        }
        Some(b) => b.clone(),
        None => DVector::zeros(n),
    };
    let w_ctrl = alg
        .weights()
        .cloned()
        .ok_or(SignalFlowError::NotInitialized("weight matrix"))?;

    let mut overrides = BasalOverrides::new();
    alg.apply_inputs(&mut overrides)?;
    let b_ctrl = overrides.applied_to(&b)?;
    let ctrl = alg.propagate_iterative(&b_ctrl, &b_ctrl, record_trajectory)?;

    let (pert, w_pert) = if data.has_link_perturbation() {
        let mut w_pert = w_ctrl.clone();
        alg.apply_perturbations(targets, &mut overrides, Some(&mut w_pert))?;
        let b_pert = overrides.applied_to(&b)?;
        let pert = alg.propagate_iterative_with_weights(
            w_pert.clone(),
            &b_pert,
            &b_pert,
            record_trajectory,
        )?;
        (pert, Some(w_pert))
    } else {
        alg.apply_perturbations(targets, &mut overrides, None)?;
        let b_pert = overrides.applied_to(&b)?;
        (alg.propagate_iterative(&b_pert, &b_pert, record_trajectory)?, None)
    };

    let activity_change = &pert.activity - &ctrl.activity;
    let signal_flow = match &w_pert {
        Some(w_pert) => flow(w_pert, &pert.activity) - flow(&w_ctrl, &ctrl.activity),
        None => flow(&w_ctrl, &activity_change),
    };

    let trajectory_change = match (ctrl.trajectory, pert.trajectory) {
        (Some(mut t_ctrl), Some(mut t_pert)) => {
            let len = t_ctrl.len().max(t_pert.len());
            pad_to(&mut t_ctrl, len);
            pad_to(&mut t_pert, len);
            Some(t_pert.iter().zip(&t_ctrl).map(|(p, c)| p - c).collect())
        }
        _ => None,
    };

    Ok(PerturbationAnalysis {
        activity_change,
        signal_flow,
        trajectory_change,
    })
}
