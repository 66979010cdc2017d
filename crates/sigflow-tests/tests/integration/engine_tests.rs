use nalgebra::DVector;
use sigflow_core::engine::algorithm::{AlgorithmState, SignalFlowAlgorithm};
use sigflow_core::engine::solver::SolveMode;
use sigflow_core::{AlgorithmRegistry, Dataset, LabeledTable, ParameterSet};
use sigflow_tests::cascade;
use std::sync::Arc;

fn cascade_data() -> Arc<Dataset> {
    let experiment = LabeledTable::new(
        vec!["none".into()],
        vec!["C".into()],
        nalgebra::DMatrix::zeros(1, 1),
    )
    .unwrap();
    Arc::new(
        Dataset::new(
            "cascade",
            Arc::new(cascade()),
            vec![sigflow_core::Condition::new("none", Vec::<&str>::new())],
            experiment,
        )
        .unwrap(),
    )
}

fn ready(name: &str, params: Option<ParameterSet>) -> Box<dyn SignalFlowAlgorithm> {
    let mut alg = AlgorithmRegistry::with_builtins().create(name).unwrap();
    if let Some(p) = params {
        alg.set_params(p);
    }
    alg.set_data(cascade_data());
    alg.initialize(true, true).unwrap();
    assert_eq!(alg.state(), AlgorithmState::DataReady);
    alg
}

fn assert_activity(x: &DVector<f64>, expected: &[f64], tol: f64) {
    for (i, e) in expected.iter().enumerate() {
        assert!((x[i] - e).abs() < tol, "x[{}] = {}, expected {}", i, x[i], e);
    }
}

#[test]
fn smoothing_cascade_reference_values() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);

    let mut gs = ready("GS", None);
    assert_activity(&gs.compute(&b).unwrap(), &[0.625, 0.25, 0.125], 1e-4);

    let params = ParameterSet::default().with_alpha(0.9).unwrap();
    let mut gs = ready("GS", Some(params));
    assert_activity(&gs.compute(&b).unwrap(), &[0.38929, 0.32143, 0.28929], 1e-4);
}

#[test]
fn smoothing_iteration_reaches_the_exact_cascade_state() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    let params = ParameterSet::default().with_tol(1e-12).unwrap();
    let mut gs = ready("gs", Some(params));
    let run = gs.propagate_iterative(&b, &b, false).unwrap();
    assert!(run.converged);
    assert_activity(&run.activity, &[0.625, 0.25, 0.125], 1e-9);
}

#[test]
fn signal_propagation_cascade_halves_per_step() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    let mut sp = ready("SP", None);
    assert_activity(&sp.compute(&b).unwrap(), &[0.5, 0.25, 0.125], 1e-12);
}

#[test]
fn cyclic_summation_excludes_the_input_term() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    let mut cps = ready("CPS", None);
    assert_activity(&cps.compute(&b).unwrap(), &[0.0, 0.5, 0.25], 1e-12);
}

#[test]
fn path_summation_on_cascade() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    let mut aps = ready("APS", None);
    assert_activity(&aps.compute(&b).unwrap(), &[1.0, 0.5, 0.25], 1e-12);
}

#[test]
fn trajectory_starts_at_x0_and_ends_at_the_result() {
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    let params = ParameterSet::default().with_exsol_forbidden(true);
    let mut sp = ready("SP", Some(params));
    let x0 = DVector::zeros(3);
    let run = sp.propagate_iterative(&x0, &b, true).unwrap();
    let trajectory = run.trajectory.unwrap();
    assert_eq!(trajectory.len(), run.iterations + 1);
    assert_eq!(trajectory[0], x0);
    assert_eq!(trajectory.last(), Some(&run.activity));
}

#[test]
fn exact_mode_is_selected_unless_forbidden() {
    use sigflow_core::engine::algorithm::SignalPropagationAlgorithm;
    use sigflow_core::engine::models::SignalPropagation;

    let mut sp = SignalPropagationAlgorithm::from_model(SignalPropagation);
    sp.set_data(cascade_data());
    sp.initialize(true, true).unwrap();
    assert_eq!(sp.solve_mode().unwrap(), SolveMode::Exact);

    let params = sp.params().clone().with_exsol_forbidden(true);
    sp.set_params(params);
    assert_eq!(sp.solve_mode().unwrap(), SolveMode::Iterative);

    // the explicit exact path ignores exsol_forbidden
    let b = DVector::from_vec(vec![1.0, 0.0, 0.0]);
    assert!(sp.compute(&b).is_ok());
    assert!(sp.propagate_exact(&b).is_ok());
}
