//! Weight-matrix owning engines and the exact/iterative selection.

use nalgebra::{DMatrix, DVector};

use crate::engine::errors::{SignalFlowError, SingularSystem};
use crate::engine::network::{ensure_square, Network};
use crate::engine::params::ParameterSet;
use crate::engine::solver::{
    ensure_finite, IterationControl, Propagation, PropagationModel, SolveMode, SolverCache,
    WeightSnapshot,
};
use crate::engine::weights::build_weight_matrix;

/// Computes steady states for one weight matrix at a time.
///
/// The batch protocol drives implementors through this trait only: it may
/// swap in a perturbed matrix and must get the original back bit for bit.
pub trait Propagator {
    fn params(&self) -> &ParameterSet;

    fn weights(&self) -> Option<&DMatrix<f64>>;

    /// Installs `weights`, returning the previous matrix and derived state.
    fn replace_weights(&mut self, weights: DMatrix<f64>) -> Result<WeightSnapshot, SignalFlowError>;

    /// Puts back a matrix taken by [`Propagator::replace_weights`].
    fn restore_weights(&mut self, snapshot: WeightSnapshot);

    /// Steady-state activity for basal vector `b`.
    fn compute(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError>;
}

/// Algorithm-facing engine: a [`Propagator`] that can also be configured and
/// (re)built from a network.
pub trait Engine: Propagator + Send {
    fn abbr(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Replaces the parameters and invalidates derived solver state. Returns
    /// true when the weight matrix itself must be rebuilt.
    fn set_params(&mut self, params: ParameterSet) -> bool;

    /// Rebuilds the weight matrix from `network` and the current parameters.
    fn build_weights(&mut self, network: &Network) -> Result<(), SignalFlowError>;

    /// Replaces the weight matrix and invalidates derived solver state.
    fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), SignalFlowError>;
}

/// A propagation model together with its weight matrix and solver cache.
#[derive(Debug, Clone)]
pub struct NetworkPropagation<M> {
    model: M,
    params: ParameterSet,
    weights: Option<DMatrix<f64>>,
    cache: SolverCache,
}

impl<M: PropagationModel> NetworkPropagation<M> {
    pub fn new(model: M) -> Self {
        let params = model.default_params();
        Self {
            model,
            params,
            weights: None,
            cache: SolverCache::default(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cache(&self) -> &SolverCache {
        &self.cache
    }

    /// Solve mode for the current weights, preparing the cache if needed.
    pub fn solve_mode(&mut self) -> Result<SolveMode, SignalFlowError> {
        self.ensure_prepared()?;
        Ok(self.cache.mode)
    }

    fn require_weights(&self) -> Result<&DMatrix<f64>, SignalFlowError> {
        self.weights
            .as_ref()
            .ok_or(SignalFlowError::NotInitialized("weight matrix"))
    }

    fn check_len(&self, what: &'static str, v: &DVector<f64>) -> Result<(), SignalFlowError> {
        let n = self.require_weights()?.nrows();
        if v.len() != n {
            return Err(SignalFlowError::dimension_mismatch(what, n, v.len()));
        }
        Ok(())
    }

    /// Builds the solver cache for the current weights.
    ///
    /// Tries the exact operator unless forbidden or unavailable; a singular
    /// system switches this weight version to iteration.
    fn prepare(&mut self) -> Result<(), SignalFlowError> {
        let w = self.require_weights()?;
        let alpha = self.params.alpha();
        let mut cache = SolverCache {
            invalidated: false,
            ..SolverCache::default()
        };

        if !self.params.exsol_forbidden() && self.model.exact_form_available() {
            match self.model.prepare_exact(w, alpha) {
                Ok(m) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        model = self.model.abbr(),
                        n = m.nrows(),
                        "prepared exact solution operator"
                    );
                    cache.exact = Some(m);
                    cache.mode = SolveMode::Exact;
                    self.cache = cache;
                    return Ok(());
                }
                Err(SingularSystem) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        model = self.model.abbr(),
                        "exact solution operator is singular; using iterative method"
                    );
                }
            }
        }

        cache.iterative = Some(self.model.prepare_iterative(w, alpha));
        cache.mode = SolveMode::Iterative;
        self.cache = cache;
        Ok(())
    }

    fn ensure_prepared(&mut self) -> Result<(), SignalFlowError> {
        if self.cache.invalidated {
            self.prepare()?;
        }
        Ok(())
    }

    /// `x = M b` with the exact operator of the current weights.
    ///
    /// Unlike [`Propagator::compute`] this never falls back: a model without a
    /// closed form is a configuration error and a singular system is returned
    /// as [`SignalFlowError::Singular`].
    pub fn propagate_exact(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        self.check_len("basal activity", b)?;
        if !self.model.exact_form_available() {
            return Err(SignalFlowError::Configuration(format!(
                "{} has no exact solution",
                self.model.abbr()
            )));
        }
        self.ensure_prepared()?;
        if self.cache.exact.is_none() {
            let m = self
                .model
                .prepare_exact(self.require_weights()?, self.params.alpha())?;
            self.cache.exact = Some(m);
        }
        let m = self
            .cache
            .exact
            .as_ref()
            .ok_or(SignalFlowError::NotInitialized("exact solution operator"))?;
        Ok(m * b)
    }

    /// Iterates from `x0` with basal vector `b` under the current parameters.
    pub fn propagate_iterative(
        &mut self,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError> {
        self.check_len("initial state", x0)?;
        self.check_len("basal activity", b)?;
        self.ensure_prepared()?;
        if self.cache.iterative.is_none() {
            let op = self
                .model
                .prepare_iterative(self.require_weights()?, self.params.alpha());
            self.cache.iterative = Some(op);
        }
        let op = self
            .cache
            .iterative
            .as_ref()
            .ok_or(SignalFlowError::NotInitialized("iterative operator"))?;
        let control = IterationControl::from_params(&self.params, record_trajectory);
        Ok(self.model.propagate_iterative(op, x0, b, &control))
    }
}

impl<M: PropagationModel> Propagator for NetworkPropagation<M> {
    fn params(&self) -> &ParameterSet {
        &self.params
    }

    fn weights(&self) -> Option<&DMatrix<f64>> {
        self.weights.as_ref()
    }

    fn replace_weights(&mut self, weights: DMatrix<f64>) -> Result<WeightSnapshot, SignalFlowError> {
        let current = self.require_weights()?;
        if weights.shape() != current.shape() {
            return Err(SignalFlowError::dimension_mismatch(
                "perturbed weight matrix",
                format!("{:?}", current.shape()),
                format!("{:?}", weights.shape()),
            ));
        }
        let previous = std::mem::replace(&mut self.weights, Some(weights))
            .ok_or(SignalFlowError::NotInitialized("weight matrix"))?;
        let cache = std::mem::take(&mut self.cache);
        Ok(WeightSnapshot {
            weights: previous,
            cache: Some(cache),
        })
    }

    fn restore_weights(&mut self, snapshot: WeightSnapshot) {
        self.weights = Some(snapshot.weights);
        self.cache = snapshot.cache.unwrap_or_default();
    }

    fn compute(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        self.check_len("basal activity", b)?;
        self.ensure_prepared()?;
        let x = match self.cache.mode {
            SolveMode::Exact => self.propagate_exact(b)?,
            SolveMode::Iterative => self.propagate_iterative(b, b, false)?.activity,
        };
        ensure_finite(&x, "activity")?;
        Ok(x)
    }
}

impl<M: PropagationModel> Engine for NetworkPropagation<M> {
    fn abbr(&self) -> &'static str {
        self.model.abbr()
    }

    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn set_params(&mut self, params: ParameterSet) -> bool {
        let stale = params.degree_norm() != self.params.degree_norm()
            || self.model.weight_scheme(&params) != self.model.weight_scheme(&self.params);
        self.params = params;
        self.cache.invalidate();
        stale
    }

    fn build_weights(&mut self, network: &Network) -> Result<(), SignalFlowError> {
        let w = build_weight_matrix(
            network.adjacency(),
            self.params.degree_norm(),
            self.model.weight_scheme(&self.params),
        )?;
        self.set_weights(w)?;
        self.prepare()
    }

    fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), SignalFlowError> {
        ensure_square(&weights, "weight matrix")?;
        self.weights = Some(weights);
        self.cache.invalidate();
        Ok(())
    }
}
