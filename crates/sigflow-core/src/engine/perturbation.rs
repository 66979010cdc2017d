//! Perturbation primitives and scope guards.
//!
//! Perturbations are collected as basal overrides plus in-place edits of a
//! weight-matrix copy. Installing them on an engine goes through guards that
//! put the original state back when dropped, on every exit path.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::engine::dataset::{Dataset, PerturbationKind};
use crate::engine::errors::SignalFlowError;
use crate::engine::params::ParameterSet;
use crate::engine::propagation::Propagator;
use crate::engine::solver::WeightSnapshot;

/// Ordered `(index, value)` writes into a basal vector. Later writes to the
/// same index win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasalOverrides {
    entries: Vec<(usize, f64)>,
}

impl BasalOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, value: f64) {
        self.entries.push((index, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Copy of `basal` with the overrides written in.
    pub fn applied_to(&self, basal: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        let mut b = basal.clone();
        self.check_bounds(b.len())?;
        for (i, v) in self.iter() {
            b[i] = v;
        }
        Ok(b)
    }

    fn check_bounds(&self, len: usize) -> Result<(), SignalFlowError> {
        match self.entries.iter().find(|(i, _)| *i >= len) {
            Some((i, _)) => Err(SignalFlowError::dimension_mismatch(
                "basal override index",
                format!("< {}", len),
                i,
            )),
            None => Ok(()),
        }
    }
}

/// Appends the dataset's global inputs unless `no_inputs` is set.
pub fn apply_inputs(data: &Dataset, params: &ParameterSet, overrides: &mut BasalOverrides) {
    if params.no_inputs() {
        return;
    }
    for input in data.inputs() {
        overrides.push(input.index, input.value);
    }
}

/// Applies the perturbations of `targets`.
///
/// Node perturbations become basal overrides. Link perturbations scale column
/// `idx` of `weights` (outgoing links); isolation scales column and row.
/// A dataset with link-type metadata requires `weights`.
pub fn apply_perturbations(
    data: &Dataset,
    targets: &[Arc<str>],
    overrides: &mut BasalOverrides,
    mut weights: Option<&mut DMatrix<f64>>,
) -> Result<(), SignalFlowError> {
    if data.has_link_perturbation() && weights.is_none() {
        return Err(SignalFlowError::Configuration(
            "weight matrix for perturbation is necessary for data including link type perturbations"
                .into(),
        ));
    }

    let network = data.network();
    for target in targets {
        let idx = network.require_index(target)?;
        let spec = data.perturbation(target);
        match spec.kind {
            PerturbationKind::Node => overrides.push(idx, spec.magnitude),
            PerturbationKind::Link | PerturbationKind::Isolation => {
                let w = weights.as_deref_mut().ok_or_else(|| {
                    SignalFlowError::Configuration(format!(
                        "{} perturbation of '{}' needs a weight matrix",
                        spec.kind, target
                    ))
                })?;
                if idx >= w.ncols() || idx >= w.nrows() {
                    return Err(SignalFlowError::dimension_mismatch(
                        "perturbed weight matrix",
                        format!("> {} rows and columns", idx),
                        format!("{}x{}", w.nrows(), w.ncols()),
                    ));
                }
                w.column_mut(idx).scale_mut(spec.magnitude);
                if spec.kind == PerturbationKind::Isolation {
                    w.row_mut(idx).scale_mut(spec.magnitude);
                }
            }
        }
    }
    Ok(())
}

/// Writes overrides into a basal vector and restores the previous values,
/// in reverse order, when dropped.
pub struct BasalOverride<'a> {
    basal: &'a mut DVector<f64>,
    saved: Vec<(usize, f64)>,
}

impl<'a> BasalOverride<'a> {
    pub fn apply(
        basal: &'a mut DVector<f64>,
        overrides: &BasalOverrides,
    ) -> Result<Self, SignalFlowError> {
        overrides.check_bounds(basal.len())?;
        let mut saved = Vec::with_capacity(overrides.len());
        for (i, v) in overrides.iter() {
            saved.push((i, basal[i]));
            basal[i] = v;
        }
        Ok(Self { basal, saved })
    }
}

impl Deref for BasalOverride<'_> {
    type Target = DVector<f64>;

    fn deref(&self) -> &DVector<f64> {
        self.basal
    }
}

impl Drop for BasalOverride<'_> {
    fn drop(&mut self) {
        for &(i, v) in self.saved.iter().rev() {
            self.basal[i] = v;
        }
    }
}

/// Installs a perturbed weight matrix on a propagator for the guard's
/// lifetime. The original matrix and its solver cache come back on drop.
pub struct ScopedWeights<'a, P: Propagator + ?Sized> {
    propagator: &'a mut P,
    snapshot: Option<WeightSnapshot>,
}

impl<'a, P: Propagator + ?Sized> ScopedWeights<'a, P> {
    pub fn install(propagator: &'a mut P, weights: DMatrix<f64>) -> Result<Self, SignalFlowError> {
        let snapshot = propagator.replace_weights(weights)?;
        Ok(Self {
            propagator,
            snapshot: Some(snapshot),
        })
    }
}

impl<P: Propagator + ?Sized> Deref for ScopedWeights<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.propagator
    }
}

impl<P: Propagator + ?Sized> DerefMut for ScopedWeights<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.propagator
    }
}

impl<P: Propagator + ?Sized> Drop for ScopedWeights<'_, P> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.propagator.restore_weights(snapshot);
        }
    }
}
