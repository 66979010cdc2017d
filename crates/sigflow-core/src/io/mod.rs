//! Readers for signal flow data files.
//!
//! - **SIF**: one link per line, `source sign target`, whitespace separated.
//! - **Inputs**: one `node value` pair per line.
//! - **TSV tables**: a header row whose first cell names the row index,
//!   followed by one row per record with the row name in the first column.
//!   Empty cells and `NaN` read as `f64::NAN`.
//! - **Perturbation tables**: TSV with the target in the first column and
//!   `Type` / `Value` columns; other columns are ignored.
//!
//! Each format has a `parse_*` function over text and a `read_*` wrapper over
//! a path. A leading UTF-8 byte order mark is skipped.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use nalgebra::DMatrix;
use rustc_hash::FxHashSet;

use crate::engine::dataset::{Condition, Dataset, PerturbationKind, PerturbationSpec};
use crate::engine::errors::SignalFlowError;
use crate::engine::network::{Network, SignedLink};
use crate::engine::table::LabeledTable;

/// Mapping from SIF sign tokens to link signs.
#[derive(Debug, Clone, PartialEq)]
pub struct SignSymbols {
    symbols: Vec<(String, f64)>,
}

impl SignSymbols {
    pub fn new<S: Into<String>, I: IntoIterator<Item = (S, f64)>>(symbols: I) -> Self {
        Self {
            symbols: symbols.into_iter().map(|(s, v)| (s.into(), v)).collect(),
        }
    }

    pub fn get(&self, token: &str) -> Option<f64> {
        self.symbols
            .iter()
            .find(|(s, _)| s == token)
            .map(|(_, v)| *v)
    }
}

impl Default for SignSymbols {
    /// `+` activates, `-` inhibits.
    fn default() -> Self {
        Self::new([("+", 1.0), ("-", -1.0)])
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Non-blank lines with their 1-based line numbers.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    strip_bom(text)
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty())
}

fn parse_error(line: usize, message: impl Into<String>) -> SignalFlowError {
    SignalFlowError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_value(line: usize, cell: &str) -> Result<f64, SignalFlowError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| parse_error(line, format!("'{}' is not a number", cell)))
}

pub fn parse_sif(text: &str, signs: &SignSymbols) -> Result<Vec<SignedLink>, SignalFlowError> {
    content_lines(text)
        .map(|(line, l)| {
            let items: Vec<&str> = l.split_whitespace().collect();
            if items.len() < 3 {
                return Err(parse_error(line, "expected 'source sign target'"));
            }
            let sign = signs
                .get(items[1])
                .ok_or_else(|| parse_error(line, format!("unknown sign '{}'", items[1])))?;
            Ok(SignedLink::new(items[0], items[2], sign))
        })
        .collect()
}

/// Reads a SIF file into a network indexed in sorted name order.
pub fn read_sif(path: impl AsRef<Path>, signs: &SignSymbols) -> Result<Network, SignalFlowError> {
    let text = fs::read_to_string(path)?;
    Network::from_links(&parse_sif(&text, signs)?)
}

pub fn parse_inputs(text: &str) -> Result<Vec<(String, f64)>, SignalFlowError> {
    content_lines(text)
        .map(|(line, l)| {
            let mut items = l.split_whitespace();
            match (items.next(), items.next()) {
                (Some(node), Some(value)) => {
                    let value = value
                        .parse::<f64>()
                        .map_err(|_| parse_error(line, format!("'{}' is not a number", value)))?;
                    Ok((node.to_string(), value))
                }
                _ => Err(parse_error(line, "expected 'node value'")),
            }
        })
        .collect()
}

pub fn read_inputs(path: impl AsRef<Path>) -> Result<Vec<(String, f64)>, SignalFlowError> {
    parse_inputs(&fs::read_to_string(path)?)
}

/// Header cells (without the index cell) and `(line, row name, cells)` records.
type Records<'a> = (Vec<&'a str>, Vec<(usize, &'a str, Vec<&'a str>)>);

fn parse_records(text: &str) -> Result<Records<'_>, SignalFlowError> {
    let mut lines = content_lines(text);
    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_error(1, "missing header row"))?;
    let columns: Vec<&str> = header.split('\t').skip(1).map(str::trim).collect();

    let mut records = Vec::new();
    for (line, l) in lines {
        let mut cells = l.split('\t');
        let name = cells.next().unwrap_or_default().trim();
        let cells: Vec<&str> = cells.collect();
        if cells.len() > columns.len() {
            return Err(parse_error(
                line,
                format!("expected {} values, found {}", columns.len(), cells.len()),
            ));
        }
        records.push((line, name, cells));
    }
    Ok((columns, records))
}

pub fn parse_table(text: &str) -> Result<LabeledTable, SignalFlowError> {
    let (columns, records) = parse_records(text)?;
    let mut values = DMatrix::from_element(records.len(), columns.len(), f64::NAN);
    let mut rows = Vec::with_capacity(records.len());
    for (i, (line, name, cells)) in records.iter().enumerate() {
        for (j, cell) in cells.iter().enumerate() {
            values[(i, j)] = parse_value(*line, cell)?;
        }
        rows.push(name.to_string());
    }
    LabeledTable::new(rows, columns.into_iter().map(str::to_owned).collect(), values)
}

pub fn read_table(path: impl AsRef<Path>) -> Result<LabeledTable, SignalFlowError> {
    parse_table(&fs::read_to_string(path)?)
}

pub fn parse_perturbations(text: &str) -> Result<Vec<(String, PerturbationSpec)>, SignalFlowError> {
    let (columns, records) = parse_records(text)?;
    let find = |name: &str| {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| parse_error(1, format!("missing '{}' column", name)))
    };
    let type_col = find("Type")?;
    let value_col = find("Value")?;

    records
        .into_iter()
        .map(|(line, target, cells)| {
            let kind = cells
                .get(type_col)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .ok_or_else(|| parse_error(line, "missing perturbation type"))?
                .parse::<PerturbationKind>()?;
            let magnitude = parse_value(line, cells.get(value_col).copied().unwrap_or(""))?;
            if magnitude.is_nan() {
                return Err(parse_error(line, "missing perturbation value"));
            }
            Ok((target.to_string(), PerturbationSpec::new(kind, magnitude)))
        })
        .collect()
}

pub fn read_perturbations(
    path: impl AsRef<Path>,
) -> Result<Vec<(String, PerturbationSpec)>, SignalFlowError> {
    parse_perturbations(&fs::read_to_string(path)?)
}

/// Tables restricted to the nodes of a network.
#[derive(Debug, Clone)]
pub struct PrunedTables {
    pub conditions: Vec<Condition>,
    pub experiment: LabeledTable,
    /// Targets that were dropped because the network lacks them.
    pub dropped_targets: Vec<Arc<str>>,
}

/// Drops every condition that targets a node missing from `network` (and the
/// matching experiment row), then every experiment column missing from it.
pub fn prune_to_network(
    network: &Network,
    conditions: Vec<Condition>,
    experiment: &LabeledTable,
) -> Result<PrunedTables, SignalFlowError> {
    if conditions.len() != experiment.shape().0 {
        return Err(SignalFlowError::dimension_mismatch(
            "conditions vs experiment rows",
            experiment.shape().0,
            conditions.len(),
        ));
    }

    let mut dropped = FxHashSet::default();
    let mut kept_rows = Vec::new();
    let mut kept_conditions = Vec::new();
    for (i, condition) in conditions.into_iter().enumerate() {
        let missing: Vec<&Arc<str>> = condition
            .targets
            .iter()
            .filter(|t| network.index_of(t).is_none())
            .collect();
        if missing.is_empty() {
            kept_rows.push(i);
            kept_conditions.push(condition);
        } else {
            dropped.extend(missing.into_iter().cloned());
        }
    }

    let kept_columns: Vec<usize> = experiment
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| network.index_of(c).is_some())
        .map(|(j, _)| j)
        .collect();

    let values = experiment.values();
    let pruned = DMatrix::from_fn(kept_rows.len(), kept_columns.len(), |i, j| {
        values[(kept_rows[i], kept_columns[j])]
    });
    let experiment = LabeledTable::new(
        kept_rows.iter().map(|&i| experiment.rows()[i].to_string()).collect(),
        kept_columns
            .iter()
            .map(|&j| experiment.columns()[j].to_string())
            .collect(),
        pruned,
    )?;

    let mut dropped_targets: Vec<Arc<str>> = dropped.into_iter().collect();
    dropped_targets.sort();
    Ok(PrunedTables {
        conditions: kept_conditions,
        experiment,
        dropped_targets,
    })
}

/// Loads a dataset directory.
///
/// Expects `network.sif`, a condition table `conds.tsv` (or `ba.tsv`) and
/// `exp.tsv`; reads `ptb.tsv` and `inputs.tsv` when present. Conditions on
/// targets outside the network are pruned, as are experiment columns and
/// perturbation rows naming such nodes. The dataset is named after the
/// directory.
pub fn load_dataset_dir(dir: impl AsRef<Path>) -> Result<Dataset, SignalFlowError> {
    let dir = dir.as_ref();
    let network = Arc::new(read_sif(dir.join("network.sif"), &SignSymbols::default())?);

    let conds_path = [dir.join("conds.tsv"), dir.join("ba.tsv")]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            SignalFlowError::Configuration(format!(
                "no condition table (conds.tsv or ba.tsv) in {}",
                dir.display()
            ))
        })?;
    let conds = read_table(conds_path)?;
    let experiment = read_table(dir.join("exp.tsv"))?;
    let pruned = prune_to_network(&network, Condition::from_table(&conds), &experiment)?;

    #[cfg(feature = "tracing")]
    {
        if !pruned.dropped_targets.is_empty() {
            tracing::warn!(
                dir = %dir.display(),
                dropped = ?pruned.dropped_targets,
                "dropped conditions targeting nodes outside the network"
            );
        }
    }

    let abbr = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    let mut dataset = Dataset::new(abbr, network.clone(), pruned.conditions, pruned.experiment)?;

    let ptb_path = dir.join("ptb.tsv");
    if ptb_path.is_file() {
        let specs = read_perturbations(ptb_path)?
            .into_iter()
            .filter(|(target, _)| network.index_of(target).is_some());
        dataset = dataset.with_perturbations(specs)?;
    }

    let inputs_path = dir.join("inputs.tsv");
    if inputs_path.is_file() {
        dataset = dataset.with_inputs(read_inputs(inputs_path)?)?;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        dataset = dataset.abbr(),
        nodes = network.len(),
        links = network.link_count(),
        conditions = dataset.conditions().len(),
        readouts = dataset.readout_indices().len(),
        "dataset loaded"
    );

    Ok(dataset)
}
