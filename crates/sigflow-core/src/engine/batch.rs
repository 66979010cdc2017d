//! Batch simulation over all conditions of a dataset.

use nalgebra::{DMatrix, DVector};

use crate::engine::dataset::Dataset;
use crate::engine::errors::SignalFlowError;
use crate::engine::perturbation::{
    apply_inputs, apply_perturbations, BasalOverride, BasalOverrides, ScopedWeights,
};
use crate::engine::propagation::Propagator;
use crate::engine::table::LabeledTable;

/// Simulates every condition of `data` and returns a conditions × readouts
/// table in the experiment table's row and column order.
///
/// Per condition the global inputs and the condition's perturbations are
/// applied, the steady state is computed and the readout entries recorded
/// (minus the control steady state when `use_rel_change` is set). `basal` and
/// the propagator's weights are restored after every condition, including on
/// error.
pub fn run_batch<P: Propagator + ?Sized>(
    propagator: &mut P,
    basal: &mut DVector<f64>,
    data: &Dataset,
) -> Result<LabeledTable, SignalFlowError> {
    let params = propagator.params().clone();
    let n = data.network().len();
    if basal.len() != n {
        return Err(SignalFlowError::dimension_mismatch("basal activity", n, basal.len()));
    }
    match propagator.weights() {
        None => return Err(SignalFlowError::NotInitialized("weight matrix")),
        Some(w) if w.nrows() != n => {
            return Err(SignalFlowError::dimension_mismatch(
                "weight matrix",
                format!("{0}x{0}", n),
                format!("{}x{}", w.nrows(), w.ncols()),
            ))
        }
        Some(_) => {}
    }

    let conditions = data.conditions();
    let readout = data.readout_indices();

    #[cfg(feature = "tracing")]
    tracing::info!(
        dataset = data.abbr(),
        conditions = conditions.len(),
        readouts = readout.len(),
        use_rel_change = params.use_rel_change(),
        "batch simulation started"
    );

    let control = if params.use_rel_change() {
        let mut overrides = BasalOverrides::new();
        apply_inputs(data, &params, &mut overrides);
        let b = BasalOverride::apply(basal, &overrides)?;
        Some(propagator.compute(&b)?)
    } else {
        None
    };

    let mut values = DMatrix::zeros(conditions.len(), readout.len());
    for (i, condition) in conditions.iter().enumerate() {
        let mut overrides = BasalOverrides::new();
        apply_inputs(data, &params, &mut overrides);

        let x = if data.has_link_perturbation() {
            let mut w_ptb = propagator
                .weights()
                .cloned()
                .ok_or(SignalFlowError::NotInitialized("weight matrix"))?;
            apply_perturbations(data, &condition.targets, &mut overrides, Some(&mut w_ptb))?;
            let mut scoped = ScopedWeights::install(&mut *propagator, w_ptb)?;
            let b = BasalOverride::apply(basal, &overrides)?;
            scoped.compute(&b)?
        } else {
            apply_perturbations(data, &condition.targets, &mut overrides, None)?;
            let b = BasalOverride::apply(basal, &overrides)?;
            propagator.compute(&b)?
        };

        for (j, &idx) in readout.iter().enumerate() {
            values[(i, j)] = match &control {
                Some(x_ctrl) => x[idx] - x_ctrl[idx],
                None => x[idx],
            };
        }
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        dataset = data.abbr(),
        conditions = conditions.len(),
        "batch simulation finished"
    );

    let experiment = data.experiment();
    Ok(LabeledTable::from_parts(
        experiment.rows().to_vec(),
        experiment.columns().to_vec(),
        values,
    ))
}
