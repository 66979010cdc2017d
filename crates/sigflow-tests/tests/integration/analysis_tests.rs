use std::sync::Arc;

use nalgebra::DVector;
use sigflow_core::{
    analyze_perturbation, calc_influence, AlgorithmRegistry, AlgorithmState, PerturbationKind,
    PerturbationSpec,
};
use sigflow_tests::{mapk_dataset, mapk_network};

const OBSERVED: [(f64, f64); 4] = [(0.0, 0.0); 4];

#[test]
fn knock_down_changes_only_downstream_nodes() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("SP").unwrap();
    alg.set_data(Arc::new(mapk_dataset(OBSERVED)));
    alg.initialize(true, true).unwrap();

    let network = mapk_network();
    let idx = |n: &str| network.index_of(n).unwrap();
    let out = analyze_perturbation(alg.as_mut(), &[Arc::from("PI3K")], None, true).unwrap();

    assert_eq!(out.activity_change[idx("EGF")], 0.0);
    assert!(out.activity_change[idx("PI3K")] < 0.0);
    assert!(out.activity_change[idx("AKT")] < 0.0);
    // less AKT means less inhibition of RAF
    assert!(out.activity_change[idx("RAF")] > 0.0);
    // the inhibitory flow AKT -| RAF weakens
    assert!(out.signal_flow[(idx("RAF"), idx("AKT"))] > 0.0);
    let trajectory = out.trajectory_change.unwrap();
    let last = trajectory.last().unwrap();
    assert!((last - &out.activity_change).amax() < 1e-4);
}

#[test]
fn link_analysis_keeps_batch_result_and_weights() {
    let data = mapk_dataset(OBSERVED)
        .with_perturbations([("PI3K", PerturbationSpec::new(PerturbationKind::Link, -1.0))])
        .unwrap();
    let registry = AlgorithmRegistry::with_builtins();
    let mut alg = registry.create("SP").unwrap();
    alg.set_data(Arc::new(data));
    alg.initialize(true, true).unwrap();
    alg.compute_batch().unwrap();
    let result = alg.result().cloned().unwrap();
    let weights = alg.weights().cloned().unwrap();

    let network = mapk_network();
    let idx = |n: &str| network.index_of(n).unwrap();
    let out = analyze_perturbation(alg.as_mut(), &[Arc::from("PI3K")], None, false).unwrap();
    // PI3K -> AKT turns inhibitory
    assert!(out.activity_change[idx("AKT")] < 0.0);

    assert_eq!(alg.state(), AlgorithmState::Computed);
    assert_eq!(alg.result(), Some(&result));
    assert_eq!(alg.weights(), Some(&weights));
}

#[test]
fn influence_ranks_upstream_regulators() {
    let network = mapk_network();
    let w = network.adjacency();
    let influence = calc_influence(w, 0.5, None, 1000, 1e-10).unwrap();
    assert!(influence.converged);
    let idx = |n: &str| network.index_of(n).unwrap();
    let e = &influence.matrix;
    // EGF reaches ERK through RAS; PI3K only through the AKT -| RAF arm
    assert!(e[(idx("ERK"), idx("EGF"))] > 0.0);
    assert!(e[(idx("ERK"), idx("PI3K"))] < 0.0);
    assert!(e[(idx("EGF"), idx("ERK"))] == 0.0);

    let b = DVector::from_fn(network.len(), |i, _| if i == idx("EGF") { 1.0 } else { 0.0 });
    let reach = e * b;
    assert!(reach[idx("AKT")] > 0.0);
}
