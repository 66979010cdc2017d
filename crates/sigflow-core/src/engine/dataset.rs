//! Perturbation datasets: network, conditions, observations and metadata.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::engine::errors::SignalFlowError;
use crate::engine::network::Network;
use crate::engine::table::LabeledTable;

/// How a perturbation target is altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PerturbationKind {
    /// Override the basal activity of the node.
    #[default]
    Node,
    /// Scale the node's outgoing links.
    Link,
    /// Scale both outgoing and incoming links.
    Isolation,
}

impl FromStr for PerturbationKind {
    type Err = SignalFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(PerturbationKind::Node),
            "link" => Ok(PerturbationKind::Link),
            "isolation" => Ok(PerturbationKind::Isolation),
            _ => Err(SignalFlowError::UnsupportedPerturbation(s.to_string())),
        }
    }
}

impl fmt::Display for PerturbationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerturbationKind::Node => "node",
            PerturbationKind::Link => "link",
            PerturbationKind::Isolation => "isolation",
        };
        f.write_str(s)
    }
}

/// Type and magnitude of the perturbation applied to one target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerturbationSpec {
    pub kind: PerturbationKind,
    pub magnitude: f64,
}

impl PerturbationSpec {
    pub fn new(kind: PerturbationKind, magnitude: f64) -> Self {
        Self { kind, magnitude }
    }
}

impl Default for PerturbationSpec {
    /// Knock-down of the node activity.
    fn default() -> Self {
        Self {
            kind: PerturbationKind::Node,
            magnitude: -1.0,
        }
    }
}

/// One experimental condition and the network nodes it perturbs.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: Arc<str>,
    pub targets: Vec<Arc<str>>,
}

impl Condition {
    pub fn new<N, S, I>(name: N, targets: I) -> Self
    where
        N: Into<Arc<str>>,
        S: Into<Arc<str>>,
        I: IntoIterator<Item = S>,
    {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// One condition per row; a column is targeted where the entry is
    /// nonzero and not NaN.
    pub fn from_table(table: &LabeledTable) -> Vec<Condition> {
        let values = table.values();
        table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| Condition {
                name: row.clone(),
                targets: table
                    .columns()
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| {
                        let v = values[(i, *j)];
                        v != 0.0 && !v.is_nan()
                    })
                    .map(|(_, c)| c.clone())
                    .collect(),
            })
            .collect()
    }
}

/// A fixed basal value applied to a node in every condition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSignal {
    pub name: Arc<str>,
    pub index: usize,
    pub value: f64,
}

/// Everything an algorithm needs to simulate and score one experiment set.
///
/// Condition `i` corresponds to row `i` of the experiment table.
#[derive(Debug, Clone)]
pub struct Dataset {
    abbr: String,
    network: Arc<Network>,
    conditions: Vec<Condition>,
    experiment: LabeledTable,
    perturbations: FxHashMap<Arc<str>, PerturbationSpec>,
    inputs: Vec<InputSignal>,
    readout_indices: Vec<usize>,
    has_link_perturbation: bool,
}

impl Dataset {
    pub fn new(
        abbr: impl Into<String>,
        network: Arc<Network>,
        conditions: Vec<Condition>,
        experiment: LabeledTable,
    ) -> Result<Self, SignalFlowError> {
        if conditions.len() != experiment.shape().0 {
            return Err(SignalFlowError::dimension_mismatch(
                "conditions vs experiment rows",
                experiment.shape().0,
                conditions.len(),
            ));
        }
        for condition in &conditions {
            for target in &condition.targets {
                network.require_index(target)?;
            }
        }
        let readout_indices = experiment
            .columns()
            .iter()
            .map(|c| network.require_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            abbr: abbr.into(),
            network,
            conditions,
            experiment,
            perturbations: FxHashMap::default(),
            inputs: Vec::new(),
            readout_indices,
            has_link_perturbation: false,
        })
    }

    /// Builds the conditions from a condition table (rows = conditions,
    /// columns = candidate targets).
    pub fn from_tables(
        abbr: impl Into<String>,
        network: Arc<Network>,
        conditions: &LabeledTable,
        experiment: LabeledTable,
    ) -> Result<Self, SignalFlowError> {
        Self::new(abbr, network, Condition::from_table(conditions), experiment)
    }

    /// Sets the perturbation metadata. Targets without metadata fall back to
    /// [`PerturbationSpec::default`].
    pub fn with_perturbations<S, I>(mut self, specs: I) -> Result<Self, SignalFlowError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, PerturbationSpec)>,
    {
        let mut perturbations = FxHashMap::default();
        for (name, spec) in specs {
            let name = name.as_ref();
            let index = self.network.require_index(name)?;
            if !spec.magnitude.is_finite() {
                return Err(SignalFlowError::Configuration(format!(
                    "perturbation of '{}' has non-finite magnitude",
                    name
                )));
            }
            perturbations.insert(self.network.names()[index].clone(), spec);
        }
        self.has_link_perturbation = perturbations
            .values()
            .any(|s| s.kind != PerturbationKind::Node);
        self.perturbations = perturbations;
        Ok(self)
    }

    /// Sets the global inputs, applied to every condition in order.
    pub fn with_inputs<S, I>(mut self, inputs: I) -> Result<Self, SignalFlowError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, f64)>,
    {
        self.inputs = inputs
            .into_iter()
            .map(|(name, value)| {
                let index = self.network.require_index(name.as_ref())?;
                Ok(InputSignal {
                    name: self.network.names()[index].clone(),
                    index,
                    value,
                })
            })
            .collect::<Result<_, SignalFlowError>>()?;
        Ok(self)
    }

    pub fn abbr(&self) -> &str {
        &self.abbr
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn experiment(&self) -> &LabeledTable {
        &self.experiment
    }

    pub fn inputs(&self) -> &[InputSignal] {
        &self.inputs
    }

    /// Network index of each experiment column, in column order.
    pub fn readout_indices(&self) -> &[usize] {
        &self.readout_indices
    }

    pub fn has_link_perturbation(&self) -> bool {
        self.has_link_perturbation
    }

    pub fn perturbation(&self, target: &str) -> PerturbationSpec {
        self.perturbations.get(target).copied().unwrap_or_default()
    }

    pub fn has_perturbation_metadata(&self) -> bool {
        !self.perturbations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::network::SignedLink;
    use nalgebra::DMatrix;

    fn network() -> Arc<Network> {
        Arc::new(
            Network::from_links(&[
                SignedLink::new("EGF", "MEK", 1.0),
                SignedLink::new("MEK", "ERK", 1.0),
                SignedLink::new("AKT", "ERK", -1.0),
            ])
            .unwrap(),
        )
    }

    fn experiment() -> LabeledTable {
        LabeledTable::new(
            vec!["ctrl".into(), "MEKi".into()],
            vec!["ERK".into()],
            DMatrix::from_row_slice(2, 1, &[0.1, -0.8]),
        )
        .unwrap()
    }

    fn two_conditions(a: &[&str], b: &[&str]) -> Vec<Condition> {
        vec![
            Condition::new("a", a.iter().copied()),
            Condition::new("b", b.iter().copied()),
        ]
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("Node".parse::<PerturbationKind>().unwrap(), PerturbationKind::Node);
        assert_eq!("ISOLATION".parse::<PerturbationKind>().unwrap(), PerturbationKind::Isolation);
        assert!(matches!(
            "knockout".parse::<PerturbationKind>(),
            Err(SignalFlowError::UnsupportedPerturbation(_))
        ));
    }

    #[test]
    fn conditions_from_table_pick_nonzero_entries() {
        let conds = LabeledTable::new(
            vec!["ctrl".into(), "MEKi".into()],
            vec!["MEK".into(), "AKT".into()],
            DMatrix::from_row_slice(2, 2, &[0.0, f64::NAN, 1.0, 0.0]),
        )
        .unwrap();
        let ds = Dataset::from_tables("toy", network(), &conds, experiment()).unwrap();
        assert!(ds.conditions()[0].targets.is_empty());
        assert_eq!(ds.conditions()[1].targets, vec![Arc::<str>::from("MEK")]);
        assert_eq!(ds.readout_indices(), &[ds.network().index_of("ERK").unwrap()]);
    }

    #[test]
    fn missing_metadata_defaults_to_knock_down() {
        let ds = Dataset::new("toy", network(), two_conditions(&["MEK"], &[]), experiment()).unwrap();
        assert_eq!(ds.perturbation("MEK"), PerturbationSpec::new(PerturbationKind::Node, -1.0));
        assert!(!ds.has_link_perturbation());
    }

    #[test]
    fn link_metadata_sets_flag() {
        let ds = Dataset::new("toy", network(), two_conditions(&["MEK"], &["AKT"]), experiment())
            .unwrap()
            .with_perturbations([("MEK", PerturbationSpec::new(PerturbationKind::Link, 0.0))])
            .unwrap();
        assert!(ds.has_link_perturbation());
        assert_eq!(ds.perturbation("MEK").kind, PerturbationKind::Link);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = Dataset::new("toy", network(), two_conditions(&["RAF"], &["AKT"]), experiment());
        assert!(matches!(err, Err(SignalFlowError::UnknownNode(n)) if n == "RAF"));

        let ds = Dataset::new("toy", network(), two_conditions(&["MEK"], &["AKT"]), experiment()).unwrap();
        assert!(ds.with_inputs([("TNF", 1.0)]).is_err());
    }

    #[test]
    fn condition_count_must_match_experiment_rows() {
        let err = Dataset::new("toy", network(), vec![Condition::new("a", ["MEK"])], experiment());
        assert!(matches!(err, Err(SignalFlowError::DimensionMismatch { .. })));
    }
}
