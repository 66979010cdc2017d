//! Algorithm instances: parameters, data binding and the compute lifecycle.
//!
//! An algorithm moves through `Uninitialized -> NetworkReady -> DataReady ->
//! Computed`. Both halves of [`SignalFlowAlgorithm::initialize`] are
//! idempotent and may be skipped when the caller knows the corresponding
//! state is unchanged, e.g. across repeated batch runs on a fixed network.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::engine::batch::run_batch;
use crate::engine::dataset::Dataset;
use crate::engine::errors::SignalFlowError;
use crate::engine::models::{
    CyclicPathSummation, GaussianSmoothing, NormalizedGaussianSmoothing, SignalPropagation,
};
use crate::engine::params::ParameterSet;
use crate::engine::paths::{AcyclicPathSummation, PathSummation};
use crate::engine::perturbation::{self, BasalOverrides, ScopedWeights};
use crate::engine::propagation::{Engine, NetworkPropagation, Propagator};
use crate::engine::solver::{Propagation, PropagationModel, SolveMode};
use crate::engine::table::LabeledTable;

/// Lifecycle position of an algorithm instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlgorithmState {
    Uninitialized,
    NetworkReady,
    DataReady,
    Computed,
}

/// Output of [`SignalFlowAlgorithm::compute_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    simulated: LabeledTable,
}

impl SimulationResult {
    /// Conditions × readouts, in the experiment table's order.
    pub fn simulated(&self) -> &LabeledTable {
        &self.simulated
    }

    pub fn into_simulated(self) -> LabeledTable {
        self.simulated
    }
}

/// Object-safe interface shared by every signal flow algorithm.
pub trait SignalFlowAlgorithm: Send {
    fn abbr(&self) -> &str;

    fn name(&self) -> &str;

    fn params(&self) -> &ParameterSet;

    /// Replaces the parameters. A change that affects the weight matrix
    /// drops the instance back to [`AlgorithmState::Uninitialized`].
    fn set_params(&mut self, params: ParameterSet);

    fn data(&self) -> Option<&Arc<Dataset>>;

    /// Binds a dataset; derived state must be rebuilt with `initialize`.
    fn set_data(&mut self, data: Arc<Dataset>);

    fn state(&self) -> AlgorithmState;

    /// Rebuilds the weight matrix (`network`) and/or the basal activity
    /// bookkeeping (`data`).
    fn initialize(&mut self, network: bool, data: bool) -> Result<(), SignalFlowError>;

    fn weights(&self) -> Option<&DMatrix<f64>>;

    /// Installs a weight matrix directly, bypassing the network.
    fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), SignalFlowError>;

    fn basal(&self) -> Option<&DVector<f64>>;

    /// Steady-state activity for `b` with the current weights.
    fn compute(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError>;

    /// Iterative propagation from `x0`, optionally recording the trajectory.
    fn propagate_iterative(
        &mut self,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError>;

    /// Like [`SignalFlowAlgorithm::propagate_iterative`] but on `weights`
    /// installed for this call only. The current matrix, its solver cache and
    /// the batch result are left as they were.
    fn propagate_iterative_with_weights(
        &mut self,
        weights: DMatrix<f64>,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError>;

    /// Simulates every condition of the bound dataset into [`Self::result`].
    fn compute_batch(&mut self) -> Result<(), SignalFlowError>;

    fn result(&self) -> Option<&SimulationResult>;

    fn apply_inputs(&self, overrides: &mut BasalOverrides) -> Result<(), SignalFlowError>;

    fn apply_perturbations(
        &self,
        targets: &[Arc<str>],
        overrides: &mut BasalOverrides,
        weights: Option<&mut DMatrix<f64>>,
    ) -> Result<(), SignalFlowError>;
}

/// Engines that also expose an iterative form with trajectories.
pub trait IterativeEngine: Engine {
    fn iterate(
        &mut self,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError>;
}

impl<M: PropagationModel> IterativeEngine for NetworkPropagation<M> {
    fn iterate(
        &mut self,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError> {
        self.propagate_iterative(x0, b, record_trajectory)
    }
}

impl IterativeEngine for AcyclicPathSummation {
    fn iterate(
        &mut self,
        _x0: &DVector<f64>,
        _b: &DVector<f64>,
        _record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError> {
        Err(SignalFlowError::Configuration(
            "APS enumerates paths and has no iterative form".into(),
        ))
    }
}

/// An engine bound to a dataset.
#[derive(Debug, Clone)]
pub struct Algorithm<E> {
    abbr: String,
    engine: E,
    data: Option<Arc<Dataset>>,
    basal: Option<DVector<f64>>,
    network_ready: bool,
    data_ready: bool,
    result: Option<SimulationResult>,
}

pub type SignalPropagationAlgorithm = Algorithm<NetworkPropagation<SignalPropagation>>;
pub type GaussianSmoothingAlgorithm = Algorithm<NetworkPropagation<GaussianSmoothing>>;
pub type NormalizedGaussianSmoothingAlgorithm =
    Algorithm<NetworkPropagation<NormalizedGaussianSmoothing>>;
pub type CyclicPathSummationAlgorithm = Algorithm<NetworkPropagation<CyclicPathSummation>>;
pub type AcyclicPathSummationAlgorithm = Algorithm<AcyclicPathSummation>;

impl<E: Engine> Algorithm<E> {
    pub fn new(abbr: impl Into<String>, engine: E) -> Self {
        Self {
            abbr: abbr.into(),
            engine,
            data: None,
            basal: None,
            network_ready: false,
            data_ready: false,
            result: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn require_data(&self) -> Result<&Arc<Dataset>, SignalFlowError> {
        self.data.as_ref().ok_or(SignalFlowError::NotInitialized("data"))
    }

    fn require_network(&self) -> Result<(), SignalFlowError> {
        if self.network_ready {
            Ok(())
        } else {
            Err(SignalFlowError::NotInitialized("network"))
        }
    }
}

impl<M: PropagationModel> Algorithm<NetworkPropagation<M>> {
    pub fn from_model(model: M) -> Self {
        let abbr = model.abbr();
        Self::new(abbr, NetworkPropagation::new(model))
    }

    /// Exact steady state, without the iterative fallback.
    pub fn propagate_exact(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        self.require_network()?;
        self.engine.propagate_exact(b)
    }

    /// Solve mode selected for the current weights.
    pub fn solve_mode(&mut self) -> Result<SolveMode, SignalFlowError> {
        self.require_network()?;
        self.engine.solve_mode()
    }
}

impl Algorithm<AcyclicPathSummation> {
    pub fn path_summation() -> Self {
        Self::new("APS", AcyclicPathSummation::new())
    }

    /// Activity plus every enumerated path.
    pub fn compute_with_paths(&mut self, b: &DVector<f64>) -> Result<PathSummation, SignalFlowError> {
        self.require_network()?;
        self.engine.compute_with_paths(b)
    }
}

impl<E: IterativeEngine> SignalFlowAlgorithm for Algorithm<E> {
    fn abbr(&self) -> &str {
        &self.abbr
    }

    fn name(&self) -> &str {
        self.engine.name()
    }

    fn params(&self) -> &ParameterSet {
        self.engine.params()
    }

    fn set_params(&mut self, params: ParameterSet) {
        if self.engine.set_params(params) {
            self.network_ready = false;
        }
        self.result = None;
    }

    fn data(&self) -> Option<&Arc<Dataset>> {
        self.data.as_ref()
    }

    fn set_data(&mut self, data: Arc<Dataset>) {
        self.data = Some(data);
        self.network_ready = false;
        self.data_ready = false;
        self.basal = None;
        self.result = None;
    }

    fn state(&self) -> AlgorithmState {
        match (self.network_ready, self.data_ready, self.result.is_some()) {
            (true, true, true) => AlgorithmState::Computed,
            (true, true, false) => AlgorithmState::DataReady,
            (true, false, _) => AlgorithmState::NetworkReady,
            (false, _, _) => AlgorithmState::Uninitialized,
        }
    }

    fn initialize(&mut self, network: bool, data: bool) -> Result<(), SignalFlowError> {
        let ds = self.require_data()?.clone();
        if network {
            self.engine.build_weights(ds.network())?;
            self.network_ready = true;
            self.result = None;
        }
        if data {
            self.basal = Some(DVector::zeros(ds.network().len()));
            self.data_ready = true;
            self.result = None;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            algorithm = %self.abbr,
            dataset = ds.abbr(),
            network,
            data,
            "algorithm initialized"
        );
        Ok(())
    }

    fn weights(&self) -> Option<&DMatrix<f64>> {
        self.engine.weights()
    }

    fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), SignalFlowError> {
        self.engine.set_weights(weights)?;
        self.network_ready = true;
        self.result = None;
        Ok(())
    }

    fn basal(&self) -> Option<&DVector<f64>> {
        self.basal.as_ref()
    }

    fn compute(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        self.require_network()?;
        self.engine.compute(b)
    }

    fn propagate_iterative(
        &mut self,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError> {
        self.require_network()?;
        self.engine.iterate(x0, b, record_trajectory)
    }

    fn propagate_iterative_with_weights(
        &mut self,
        weights: DMatrix<f64>,
        x0: &DVector<f64>,
        b: &DVector<f64>,
        record_trajectory: bool,
    ) -> Result<Propagation, SignalFlowError> {
        self.require_network()?;
        let mut scoped = ScopedWeights::install(&mut self.engine, weights)?;
        let propagation = scoped.iterate(x0, b, record_trajectory);
        drop(scoped);
        propagation
    }

    fn compute_batch(&mut self) -> Result<(), SignalFlowError> {
        self.require_network()?;
        if !self.data_ready {
            return Err(SignalFlowError::NotInitialized("basal activity"));
        }
        let ds = self.require_data()?.clone();
        self.result = None;
        let mut basal = self
            .basal
            .take()
            .ok_or(SignalFlowError::NotInitialized("basal activity"))?;

        let outcome = run_batch(&mut self.engine, &mut basal, &ds);
        self.basal = Some(basal);

        self.result = Some(SimulationResult {
            simulated: outcome?,
        });
        Ok(())
    }

    fn result(&self) -> Option<&SimulationResult> {
        self.result.as_ref()
    }

    fn apply_inputs(&self, overrides: &mut BasalOverrides) -> Result<(), SignalFlowError> {
        let ds = self.require_data()?;
        perturbation::apply_inputs(ds, self.engine.params(), overrides);
        Ok(())
    }

    fn apply_perturbations(
        &self,
        targets: &[Arc<str>],
        overrides: &mut BasalOverrides,
        weights: Option<&mut DMatrix<f64>>,
    ) -> Result<(), SignalFlowError> {
        let ds = self.require_data()?;
        perturbation::apply_perturbations(ds, targets, overrides, weights)
    }
}
