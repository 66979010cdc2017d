//! # Sigflow Core
//!
//! Signal flow propagation on signed networks: steady-state solvers, the
//! perturbation batch protocol and sign-agreement scoring.

pub mod engine;
pub mod io;
pub mod metrics;
pub mod registry;

// Re-export commonly used types
pub use engine::algorithm::{AlgorithmState, SignalFlowAlgorithm, SimulationResult};
pub use engine::dataset::{Condition, Dataset, PerturbationKind, PerturbationSpec};
pub use engine::errors::{SignalFlowError, SingularSystem};
pub use engine::influence::{analyze_perturbation, calc_influence};
pub use engine::network::{Network, SignedLink};
pub use engine::params::ParameterSet;
pub use engine::table::LabeledTable;
pub use metrics::{calc_accuracy, calc_consensus, ConsensusTable};
pub use registry::AlgorithmRegistry;

/// Runs a registered algorithm on a dataset and scores it against the
/// dataset's experiment table.
///
/// This is a convenience function that combines creation, initialization,
/// batch simulation and scoring.
pub fn simulate_and_score(
    registry: &AlgorithmRegistry,
    name: &str,
    params: Option<ParameterSet>,
    data: std::sync::Arc<Dataset>,
) -> Result<(SimulationResult, f64), SignalFlowError> {
    let mut alg = registry
        .create(name)
        .ok_or_else(|| SignalFlowError::Configuration(format!("unknown algorithm '{}'", name)))?;
    if let Some(params) = params {
        alg.set_params(params);
    }
    alg.set_data(data.clone());
    alg.initialize(true, true)?;
    alg.compute_batch()?;
    let result = alg
        .result()
        .cloned()
        .ok_or(SignalFlowError::NotInitialized("simulation result"))?;
    let (accuracy, _) = metrics::score_tables(result.simulated(), data.experiment())?;
    Ok((result, accuracy))
}
