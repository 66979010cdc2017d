//! Steady-state solvers shared by the propagation models.
//!
//! A propagation model supplies two derived artifacts from the weight matrix:
//! an exact solution operator `M` (so that `x = M b`) and an
//! [`IterativeOperator`] for the fixed-point form `x' = T x + g ∘ b`. Both are
//! cached in a [`SolverCache`] keyed to one weight-matrix version; replacing
//! the weights invalidates the cache.

use nalgebra::{DMatrix, DVector};

use crate::engine::errors::{SignalFlowError, SingularSystem};
use crate::engine::params::ParameterSet;
use crate::engine::weights::WeightScheme;

/// Linear fixed-point update `x' = transition * x + input_gain ∘ b`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterativeOperator {
    pub transition: DMatrix<f64>,
    pub input_gain: DVector<f64>,
}

impl IterativeOperator {
    /// Plain damped propagation: `T = αW`, `g = (1-α)`.
    pub fn damped(w: &DMatrix<f64>, alpha: f64) -> Self {
        Self {
            transition: w * alpha,
            input_gain: DVector::from_element(w.nrows(), 1.0 - alpha),
        }
    }

    pub fn dim(&self) -> usize {
        self.input_gain.len()
    }

    #[inline]
    pub fn step(&self, x: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        &self.transition * x + self.input_gain.component_mul(b)
    }
}

/// Loop bounds of one iterative run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationControl {
    pub lim_iter: usize,
    pub tol: f64,
    /// Keep every intermediate state (initial state included).
    pub record_trajectory: bool,
}

impl IterationControl {
    pub fn from_params(params: &ParameterSet, record_trajectory: bool) -> Self {
        Self {
            lim_iter: params.lim_iter(),
            tol: params.tol(),
            record_trajectory,
        }
    }
}

/// Result of an iterative run.
///
/// Reaching `lim_iter` is not an error: `converged` is false and `activity`
/// holds the last iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    pub activity: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// `‖x(t+1) - x(t)‖` at the last step.
    pub final_delta: f64,
    pub trajectory: Option<Vec<DVector<f64>>>,
}

/// Iterates `op` from `x0` until `‖x(t+1) - x(t)‖ <= tol` or `lim_iter` steps.
pub fn iterate_fixed_point(
    op: &IterativeOperator,
    x0: &DVector<f64>,
    b: &DVector<f64>,
    control: &IterationControl,
) -> Propagation {
    let mut x = x0.clone();
    let mut trajectory = control.record_trajectory.then(|| vec![x.clone()]);
    let mut iterations = 0;
    let mut converged = false;
    let mut final_delta = f64::INFINITY;

    while iterations < control.lim_iter {
        let next = op.step(&x, b);
        iterations += 1;
        final_delta = (&next - &x).norm();
        x = next;
        if let Some(trj) = trajectory.as_mut() {
            trj.push(x.clone());
        }
        if final_delta <= control.tol {
            converged = true;
            break;
        }
    }

    log_iteration_outcome(iterations, converged, final_delta);

    Propagation {
        activity: x,
        iterations,
        converged,
        final_delta,
        trajectory,
    }
}

pub(crate) fn log_iteration_outcome(iterations: usize, converged: bool, final_delta: f64) {
    #[cfg(feature = "tracing")]
    {
        if converged {
            tracing::debug!(iterations, final_delta, "iterative propagation converged");
        } else {
            tracing::warn!(
                iterations,
                final_delta,
                "iterative propagation reached lim_iter without converging"
            );
        }
    }
    #[cfg(not(feature = "tracing"))]
    let _ = (iterations, converged, final_delta);
}

/// Which path `compute` takes for the current weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMode {
    Exact,
    #[default]
    Iterative,
}

/// Derived operators for one version of the weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverCache {
    pub(crate) exact: Option<DMatrix<f64>>,
    pub(crate) iterative: Option<IterativeOperator>,
    pub(crate) mode: SolveMode,
    pub(crate) invalidated: bool,
}

impl Default for SolverCache {
    fn default() -> Self {
        Self {
            exact: None,
            iterative: None,
            mode: SolveMode::Iterative,
            invalidated: true,
        }
    }
}

impl SolverCache {
    pub fn mode(&self) -> SolveMode {
        self.mode
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn exact_operator(&self) -> Option<&DMatrix<f64>> {
        self.exact.as_ref()
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// Weights and solver state moved out while a perturbed matrix is installed.
#[derive(Debug, Clone)]
pub struct WeightSnapshot {
    pub(crate) weights: DMatrix<f64>,
    pub(crate) cache: Option<SolverCache>,
}

/// One steady-state formulation of signal flow over a weight matrix.
///
/// Models are stateless; all derived state lives in the engine's
/// [`SolverCache`].
pub trait PropagationModel: Send + Sync {
    fn abbr(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn default_params(&self) -> ParameterSet {
        ParameterSet::default()
    }

    /// Weighting applied to the adjacency matrix when normalization is off.
    fn weight_scheme(&self, _params: &ParameterSet) -> WeightScheme {
        WeightScheme::Unit
    }

    fn exact_form_available(&self) -> bool {
        true
    }

    /// Builds `M` with `x = M b`. `Err(SingularSystem)` selects iteration.
    fn prepare_exact(
        &self,
        w: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<DMatrix<f64>, SingularSystem>;

    fn prepare_iterative(&self, w: &DMatrix<f64>, alpha: f64) -> IterativeOperator;

    fn propagate_iterative(
        &self,
        op: &IterativeOperator,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        control: &IterationControl,
    ) -> Propagation {
        iterate_fixed_point(op, x0, b, control)
    }
}

/// Inverts `m`, treating non-invertible or non-finite results as singular.
pub fn invert(m: DMatrix<f64>) -> Result<DMatrix<f64>, SingularSystem> {
    let inv = m.try_inverse().ok_or(SingularSystem)?;
    if inv.iter().all(|v| v.is_finite()) {
        Ok(inv)
    } else {
        Err(SingularSystem)
    }
}

/// Fails with [`SignalFlowError::Numerical`] on NaN or infinite entries.
pub fn ensure_finite(x: &DVector<f64>, what: &str) -> Result<(), SignalFlowError> {
    match x.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(i) => Err(SignalFlowError::Numerical(format!(
            "{} has non-finite value {} at index {}",
            what, x[i], i
        ))),
    }
}

/// Sign function with `sign(0) = 0` (unlike `f64::signum`).
#[inline]
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else if v == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}
