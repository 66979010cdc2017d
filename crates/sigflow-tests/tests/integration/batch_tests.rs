use std::sync::Arc;

use nalgebra::DVector;
use sigflow_core::{
    simulate_and_score, AlgorithmRegistry, AlgorithmState, ParameterSet, PerturbationKind,
    PerturbationSpec,
};
use sigflow_tests::mapk_dataset;

// Relative-change signs of SP (alpha = 0.5) on the MAPK fixture, (ERK, AKT):
// ctrl (0, 0), MEKi (-, 0), PI3Ki (+, -), RAFi (-, 0).
const MATCHING: [(f64, f64); 4] = [(0.0, 0.0), (-0.8, 0.0), (0.3, -0.9), (-0.5, 0.0)];

fn rel_change() -> ParameterSet {
    ParameterSet::default().with_use_rel_change(true)
}

#[test]
fn relative_change_batch_reproduces_sign_pattern() {
    let registry = AlgorithmRegistry::with_builtins();
    let data = Arc::new(mapk_dataset(MATCHING));
    let (result, accuracy) = simulate_and_score(&registry, "SP", Some(rel_change()), data).unwrap();
    assert_eq!(accuracy, 1.0);

    let sim = result.simulated();
    assert_eq!(sim.shape(), (4, 2));
    assert_eq!(sim.columns()[0].as_ref(), "ERK");
    assert_eq!(sim.get("ctrl", "ERK"), Some(0.0));
    let erk_meki = sim.get("MEKi", "ERK").unwrap();
    assert!((erk_meki + 0.235294).abs() < 1e-5, "ERK under MEKi: {}", erk_meki);
}

#[test]
fn one_mismatching_observation_costs_one_entry() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut observed = MATCHING;
    observed[2].0 = -0.3;
    let data = Arc::new(mapk_dataset(observed));
    let (_, accuracy) = simulate_and_score(&registry, "sp", Some(rel_change()), data).unwrap();
    assert!((accuracy - 7.0 / 8.0).abs() < 1e-12);
}

#[test]
fn absolute_mode_reports_steady_states() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("SP").unwrap();
    alg.set_data(Arc::new(mapk_dataset(MATCHING)));
    alg.initialize(true, true).unwrap();
    alg.compute_batch().unwrap();
    assert_eq!(alg.state(), AlgorithmState::Computed);

    let sim = alg.result().unwrap().simulated();
    assert!(sim.get("ctrl", "ERK").unwrap() > 0.0);
    assert!((sim.get("ctrl", "AKT").unwrap() - 0.125).abs() < 1e-12);
    assert!(sim.get("MEKi", "ERK").unwrap() < 0.0);
    assert!((sim.get("PI3Ki", "AKT").unwrap() + 0.125).abs() < 1e-12);
}

#[test]
fn batch_leaves_basal_activity_and_weights_untouched() {
    let registry = AlgorithmRegistry::with_builtins();
    let data = mapk_dataset(MATCHING)
        .with_perturbations([("MEK", PerturbationSpec::new(PerturbationKind::Link, 0.0))])
        .unwrap();
    let mut alg = registry.create("SP").unwrap();
    alg.set_params(rel_change());
    alg.set_data(Arc::new(data));
    alg.initialize(true, true).unwrap();
    let weights = alg.weights().cloned().unwrap();

    alg.compute_batch().unwrap();
    assert_eq!(alg.weights(), Some(&weights));
    assert_eq!(alg.basal(), Some(&DVector::zeros(7)));

    // cutting MEK -> ERK silences ERK entirely; AKT is unaffected
    let sim = alg.result().unwrap().simulated();
    let erk_meki = sim.get("MEKi", "ERK").unwrap();
    let erk_ctrl_abs = 0.014706;
    assert!((erk_meki + erk_ctrl_abs).abs() < 1e-5, "ERK under MEK link cut: {}", erk_meki);
    assert_eq!(sim.get("MEKi", "AKT"), Some(0.0));
}

#[test]
fn repeated_batches_are_identical() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("GS").unwrap();
    alg.set_params(rel_change());
    alg.set_data(Arc::new(mapk_dataset(MATCHING)));
    alg.initialize(true, true).unwrap();
    alg.compute_batch().unwrap();
    let first = alg.result().cloned().unwrap();
    alg.compute_batch().unwrap();
    assert_eq!(alg.result(), Some(&first));
}

#[test]
fn no_inputs_drops_the_global_stimulus() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("SP").unwrap();
    alg.set_params(ParameterSet::default().with_no_inputs(true));
    alg.set_data(Arc::new(mapk_dataset(MATCHING)));
    alg.initialize(true, true).unwrap();
    alg.compute_batch().unwrap();
    let sim = alg.result().unwrap().simulated();
    assert_eq!(sim.get("ctrl", "ERK"), Some(0.0));
    assert_eq!(sim.get("ctrl", "AKT"), Some(0.0));
}
