//! Sign-agreement scoring of simulated against observed results.
//!
//! Two tables agree at `(i, j)` when both entries have the same sign, with
//! zero as its own sign class. Accuracy is the fraction of agreeing entries.

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::engine::errors::SignalFlowError;
use crate::engine::solver::sign;
use crate::engine::table::LabeledTable;

/// Elementwise sign agreement between two equal-shaped tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusTable {
    agree: DMatrix<bool>,
    rows: Option<Vec<Arc<str>>>,
    columns: Option<Vec<Arc<str>>>,
}

impl ConsensusTable {
    pub fn matrix(&self) -> &DMatrix<bool> {
        &self.agree
    }

    pub fn shape(&self) -> (usize, usize) {
        self.agree.shape()
    }

    /// Row labels, when built from labelled tables.
    pub fn rows(&self) -> Option<&[Arc<str>]> {
        self.rows.as_deref()
    }

    pub fn columns(&self) -> Option<&[Arc<str>]> {
        self.columns.as_deref()
    }

    pub fn agreements(&self) -> usize {
        self.agree.iter().filter(|&&a| a).count()
    }

    /// Fraction of agreeing entries; `None` for an empty table.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.agree.len();
        (total > 0).then(|| self.agreements() as f64 / total as f64)
    }
}

fn check_shapes(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<(), SignalFlowError> {
    if a.shape() != b.shape() {
        return Err(SignalFlowError::ShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        });
    }
    if a.is_empty() {
        return Err(SignalFlowError::Configuration(
            "cannot score empty result tables".into(),
        ));
    }
    Ok(())
}

/// `consensus[i, j] = sign(x1[i, j]) == sign(x2[i, j])`.
pub fn calc_consensus(
    x1: &DMatrix<f64>,
    x2: &DMatrix<f64>,
) -> Result<ConsensusTable, SignalFlowError> {
    check_shapes(x1, x2)?;
    Ok(ConsensusTable {
        agree: x1.zip_map(x2, |a, b| sign(a) == sign(b)),
        rows: None,
        columns: None,
    })
}

/// Fraction of entries whose signs agree.
pub fn calc_accuracy(x1: &DMatrix<f64>, x2: &DMatrix<f64>) -> Result<f64, SignalFlowError> {
    accuracy_with_consensus(x1, x2).map(|(acc, _)| acc)
}

pub fn accuracy_with_consensus(
    x1: &DMatrix<f64>,
    x2: &DMatrix<f64>,
) -> Result<(f64, ConsensusTable), SignalFlowError> {
    let consensus = calc_consensus(x1, x2)?;
    let total = consensus.agree.len();
    let acc = consensus.agreements() as f64 / total as f64;
    Ok((acc, consensus))
}

/// Scores a simulated table against an observed one with the same labels.
///
/// The observed columns are reordered to the simulated column order; the rows
/// must already correspond.
pub fn score_tables(
    simulated: &LabeledTable,
    observed: &LabeledTable,
) -> Result<(f64, ConsensusTable), SignalFlowError> {
    let aligned;
    let observed = if simulated.columns() == observed.columns() {
        observed
    } else {
        aligned = observed.select_columns(simulated.columns())?;
        &aligned
    };
    if simulated.rows() != observed.rows() {
        return Err(SignalFlowError::Configuration(
            "simulated and observed tables list different conditions".into(),
        ));
    }
    let (acc, mut consensus) = accuracy_with_consensus(simulated.values(), observed.values())?;
    consensus.rows = Some(simulated.rows().to_vec());
    consensus.columns = Some(simulated.columns().to_vec());

    #[cfg(feature = "tracing")]
    tracing::debug!(
        accuracy = acc,
        agreements = consensus.agreements(),
        total = consensus.agree.len(),
        "scored simulated results"
    );

    Ok((acc, consensus))
}
