use nalgebra::DMatrix;
use sigflow_core::metrics::{accuracy_with_consensus, score_tables};
use sigflow_core::{calc_accuracy, LabeledTable, SignalFlowError};

fn observed() -> DMatrix<f64> {
    DMatrix::from_row_slice(3, 4, &[
        0.2, -0.4, 1.5, -2.0, //
        -0.1, 0.7, -0.3, 0.9, //
        3.0, -1.2, 0.05, -0.6,
    ])
}

#[test]
fn identical_signs_are_fully_accurate() {
    let x = observed();
    assert_eq!(calc_accuracy(&x, &x.map(|v| v * 0.01)).unwrap(), 1.0);
}

#[test]
fn opposite_signs_are_fully_inaccurate() {
    let x = observed();
    assert_eq!(calc_accuracy(&x, &x.map(|v| -v)).unwrap(), 0.0);
}

#[test]
fn single_flip_scores_n_minus_one_over_n() {
    let x = observed();
    for (i, j) in [(0, 0), (1, 3), (2, 2)] {
        let mut y = x.clone();
        y[(i, j)] = -y[(i, j)];
        let (acc, consensus) = accuracy_with_consensus(&x, &y).unwrap();
        assert!((acc - 11.0 / 12.0).abs() < 1e-15);
        assert!(!consensus.matrix()[(i, j)]);
        assert_eq!(consensus.accuracy(), Some(acc));
    }
}

#[test]
fn shape_mismatch_is_an_error() {
    let x = observed();
    let y = DMatrix::zeros(4, 3);
    assert!(matches!(
        calc_accuracy(&x, &y),
        Err(SignalFlowError::ShapeMismatch { .. })
    ));
}

#[test]
fn labelled_scoring_rejects_different_conditions() {
    let sim = LabeledTable::new(vec!["a".into()], vec!["X".into()], DMatrix::zeros(1, 1)).unwrap();
    let obs = LabeledTable::new(vec!["b".into()], vec!["X".into()], DMatrix::zeros(1, 1)).unwrap();
    assert!(matches!(
        score_tables(&sim, &obs),
        Err(SignalFlowError::Configuration(_))
    ));
}
