//! Cyclic path summation: the undamped series `Σ_{k≥1} (αW)^k b`.
//!
//! Every walk (cycles included) from a source contributes the product of its
//! link weights scaled by `α` per step. The basal vector itself (length-zero
//! walks) is not part of the sum. There is no closed form in use, so the
//! exact path is always off.

use nalgebra::{DMatrix, DVector};

use crate::engine::errors::SingularSystem;
use crate::engine::params::ParameterSet;
use crate::engine::solver::{
    log_iteration_outcome, IterationControl, IterativeOperator, Propagation, PropagationModel,
};

/// Default tolerance of the path series.
pub const CPS_DEFAULT_TOL: f64 = 1e-8;

/// Cyclic path summation (`CPS`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclicPathSummation;

impl PropagationModel for CyclicPathSummation {
    fn abbr(&self) -> &'static str {
        "CPS"
    }

    fn name(&self) -> &'static str {
        "Cyclic path summation algorithm"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::default()
            .with_exsol_forbidden(true)
            .with_default_tol(CPS_DEFAULT_TOL)
    }

    fn exact_form_available(&self) -> bool {
        false
    }

    fn prepare_exact(
        &self,
        _w: &DMatrix<f64>,
        _alpha: f64,
    ) -> Result<DMatrix<f64>, SingularSystem> {
        Err(SingularSystem)
    }

    fn prepare_iterative(&self, w: &DMatrix<f64>, alpha: f64) -> IterativeOperator {
        IterativeOperator {
            transition: w * alpha,
            input_gain: DVector::zeros(w.nrows()),
        }
    }

    /// Sums the walk contributions `x(t+1) = αW x(t)`, starting from `x(0) = b`.
    ///
    /// `x0` is unused: the series always starts at the basal vector. The
    /// recorded trajectory holds the running sums.
    fn propagate_iterative(
        &self,
        op: &IterativeOperator,
        _x0: &DVector<f64>,
        b: &DVector<f64>,
        control: &IterationControl,
    ) -> Propagation {
        let mut sum = DVector::zeros(b.len());
        let mut x = b.clone();
        let mut trajectory = control.record_trajectory.then(|| vec![sum.clone()]);
        let mut iterations = 0;
        let mut converged = false;
        let mut final_delta = f64::INFINITY;

        while iterations < control.lim_iter {
            let next = &op.transition * &x;
            sum += &next;
            iterations += 1;
            final_delta = (&next - &x).norm();
            x = next;
            if let Some(trj) = trajectory.as_mut() {
                trj.push(sum.clone());
            }
            if final_delta <= control.tol {
                converged = true;
                break;
            }
        }

        log_iteration_outcome(iterations, converged, final_delta);

        Propagation {
            activity: sum,
            iterations,
            converged,
            final_delta,
            trajectory,
        }
    }
}
