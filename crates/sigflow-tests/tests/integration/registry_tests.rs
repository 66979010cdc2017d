use std::sync::Arc;

use sigflow_core::{AlgorithmRegistry, AlgorithmState, ParameterSet};
use sigflow_tests::mapk_dataset;

const OBSERVED: [(f64, f64); 4] = [(0.1, 0.2), (-0.8, 0.1), (0.3, -0.9), (-0.5, 0.0)];

#[test]
fn every_builtin_runs_a_batch() {
    let registry = AlgorithmRegistry::with_builtins();
    let data = Arc::new(mapk_dataset(OBSERVED));
    for name in registry.names() {
        let mut alg = registry.create(name).unwrap();
        assert_eq!(alg.abbr(), name);
        alg.set_data(data.clone());
        alg.initialize(true, true).unwrap();
        alg.compute_batch().unwrap();
        assert_eq!(alg.state(), AlgorithmState::Computed);
        let sim = alg.result().unwrap().simulated();
        assert_eq!(sim.shape(), (4, 2), "{}", name);
        assert!(sim.values().iter().all(|v| v.is_finite()), "{}", name);
    }
}

#[test]
fn every_builtin_has_a_descriptive_name() {
    let registry = AlgorithmRegistry::with_builtins();
    for name in registry.names() {
        let alg = registry.create(name).unwrap();
        assert!(!alg.name().is_empty());
        assert_ne!(alg.name(), alg.abbr());
    }
}

#[test]
fn weight_affecting_parameters_reset_the_lifecycle() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("APS").unwrap();
    alg.set_data(Arc::new(mapk_dataset(OBSERVED)));
    alg.initialize(true, true).unwrap();
    alg.compute_batch().unwrap();

    // APS bakes alpha into the link weights
    alg.set_params(ParameterSet::default().with_alpha(0.3).unwrap());
    assert_eq!(alg.state(), AlgorithmState::Uninitialized);
    assert!(alg.compute_batch().is_err());
    alg.initialize(true, false).unwrap();
    alg.compute_batch().unwrap();
}

#[test]
fn unknown_algorithms_are_reported() {
    let registry = AlgorithmRegistry::with_builtins();
    let err = sigflow_core::simulate_and_score(
        &registry,
        "PageRank",
        None,
        Arc::new(mapk_dataset(OBSERVED)),
    )
    .unwrap_err();
    assert!(err.to_string().contains("PageRank"));
}
