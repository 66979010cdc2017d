//! Signed directed networks.
//!
//! A [`Network`] stores the signed adjacency matrix together with the
//! bijection between node names and matrix indices. Links are stored
//! target-major: `A[(t, s)]` is the sign of the link `s -> t`, so that
//! `A * x` moves activity from sources to targets.

use std::collections::BTreeSet;
use std::sync::Arc;

use nalgebra::DMatrix;
use rustc_hash::FxHashMap;

use crate::engine::errors::SignalFlowError;

/// A single signed link `source -> target`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedLink {
    pub source: String,
    pub target: String,
    /// `+1.0` for activation, `-1.0` for inhibition.
    pub sign: f64,
}

impl SignedLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>, sign: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            sign,
        }
    }
}

/// Signed adjacency matrix plus node-name index.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    adjacency: DMatrix<f64>,
    names: Vec<Arc<str>>,
    index: FxHashMap<Arc<str>, usize>,
}

impl Network {
    /// Builds a network from a square adjacency matrix and one name per row.
    pub fn from_adjacency(
        adjacency: DMatrix<f64>,
        names: Vec<String>,
    ) -> Result<Self, SignalFlowError> {
        ensure_square(&adjacency, "adjacency matrix")?;
        if names.len() != adjacency.nrows() {
            return Err(SignalFlowError::dimension_mismatch(
                "node names",
                adjacency.nrows(),
                names.len(),
            ));
        }

        let names: Vec<Arc<str>> = names.into_iter().map(Arc::from).collect();
        let mut index = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SignalFlowError::Configuration(format!(
                    "duplicate node name '{}'",
                    name
                )));
            }
        }

        Ok(Self {
            adjacency,
            names,
            index,
        })
    }

    /// Builds a network from signed links. Nodes are indexed in sorted name
    /// order; a repeated link keeps the last sign seen.
    pub fn from_links(links: &[SignedLink]) -> Result<Self, SignalFlowError> {
        let names: BTreeSet<&str> = links
            .iter()
            .flat_map(|l| [l.source.as_str(), l.target.as_str()])
            .collect();
        let names: Vec<String> = names.into_iter().map(str::to_owned).collect();
        let lookup: FxHashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let n = names.len();
        let mut adjacency = DMatrix::zeros(n, n);
        for link in links {
            if !link.sign.is_finite() {
                return Err(SignalFlowError::Configuration(format!(
                    "link {} -> {} has non-finite sign",
                    link.source, link.target
                )));
            }
            let s = lookup[link.source.as_str()];
            let t = lookup[link.target.as_str()];
            adjacency[(t, s)] = link.sign;
        }

        Self::from_adjacency(adjacency, names)
    }

    pub fn adjacency(&self) -> &DMatrix<f64> {
        &self.adjacency
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Index of `name`, if it is a node of this network.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Like [`Network::index_of`] but reports unknown names as an error.
    pub fn require_index(&self, name: &str) -> Result<usize, SignalFlowError> {
        self.index_of(name)
            .ok_or_else(|| SignalFlowError::UnknownNode(name.to_string()))
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|n| n.as_ref())
    }

    /// Number of nonzero links.
    pub fn link_count(&self) -> usize {
        self.adjacency.iter().filter(|v| **v != 0.0).count()
    }
}

/// Fails with a dimension error unless `m` is square.
pub fn ensure_square(m: &DMatrix<f64>, what: &'static str) -> Result<(), SignalFlowError> {
    if m.nrows() != m.ncols() {
        return Err(SignalFlowError::dimension_mismatch(
            what,
            format!("square matrix ({0}x{0})", m.nrows()),
            format!("{}x{}", m.nrows(), m.ncols()),
        ));
    }
    Ok(())
}
