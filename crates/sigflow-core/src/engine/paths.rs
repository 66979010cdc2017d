//! Acyclic path summation: signal flow as a sum over simple paths.
//!
//! For every source `s` with nonzero basal activity and every target `t`, each
//! simple directed path `s = v0 -> v1 -> ... -> vk = t` contributes
//! `b[s] * Π W[v(i+1), v(i)]`. A node is its own length-zero path, so `b[t]`
//! always reaches `t`. The result truncates the power series of the
//! propagation models to acyclic terms; cost grows combinatorially with the
//! path length and branching factor.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use petgraph::algo::all_simple_paths;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::engine::errors::SignalFlowError;
use crate::engine::network::{ensure_square, Network};
use crate::engine::params::ParameterSet;
use crate::engine::propagation::{Engine, Propagator};
use crate::engine::solver::{ensure_finite, WeightSnapshot};
use crate::engine::weights::{build_weight_matrix, WeightScheme};

/// A single enumerated path and its signed contribution to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPath {
    pub nodes: Vec<Arc<str>>,
    pub contribution: f64,
}

/// Activity vector plus the paths that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSummation {
    pub activity: DVector<f64>,
    pub paths: Vec<SignalPath>,
}

/// Path enumeration engine (`APS`).
///
/// Links carry the weight `alpha` (times their sign) unless
/// `apply_weight_norm` is set, in which case the degree-normalized adjacency
/// provides per-link weights.
#[derive(Debug, Clone, Default)]
pub struct AcyclicPathSummation {
    params: ParameterSet,
    weights: Option<DMatrix<f64>>,
    names: Vec<Arc<str>>,
    graph: Option<DiGraph<usize, f64>>,
}

impl AcyclicPathSummation {
    pub fn new() -> Self {
        Self::default()
    }

    fn weight_scheme(params: &ParameterSet) -> WeightScheme {
        WeightScheme::Scaled(params.alpha())
    }

    fn require_weights(&self) -> Result<&DMatrix<f64>, SignalFlowError> {
        self.weights
            .as_ref()
            .ok_or(SignalFlowError::NotInitialized("weight matrix"))
    }

    fn node_name(&self, index: usize) -> Arc<str> {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| Arc::from(index.to_string()))
    }

    /// Directed graph with an edge `s -> t` for every nonzero `W[t, s]`.
    fn ensure_graph(&mut self) -> Result<(), SignalFlowError> {
        if self.graph.is_some() {
            return Ok(());
        }
        let w = self.require_weights()?;
        let n = w.nrows();
        let mut graph = DiGraph::with_capacity(n, 0);
        let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();
        for s in 0..n {
            for t in 0..n {
                let weight = w[(t, s)];
                if weight != 0.0 {
                    graph.add_edge(nodes[s], nodes[t], weight);
                }
            }
        }
        self.graph = Some(graph);
        Ok(())
    }

    fn wire(
        &mut self,
        b: &DVector<f64>,
        mut sink: Option<&mut Vec<SignalPath>>,
    ) -> Result<DVector<f64>, SignalFlowError> {
        let n = self.require_weights()?.nrows();
        if b.len() != n {
            return Err(SignalFlowError::dimension_mismatch("basal activity", n, b.len()));
        }
        self.ensure_graph()?;
        let (Some(w), Some(graph)) = (self.weights.as_ref(), self.graph.as_ref()) else {
            return Err(SignalFlowError::NotInitialized("path graph"));
        };

        let max_intermediate = self.params.max_path_length().map(|l| l.saturating_sub(1));
        let no_links = self.params.max_path_length() == Some(0);
        let sources: Vec<usize> = (0..n).filter(|&s| b[s] != 0.0).collect();

        let mut activity = DVector::zeros(n);
        for t in 0..n {
            let mut effect = 0.0;
            for &s in &sources {
                if s == t {
                    effect += b[s];
                    if let Some(paths) = sink.as_deref_mut() {
                        paths.push(SignalPath {
                            nodes: vec![self.node_name(s)],
                            contribution: b[s],
                        });
                    }
                    continue;
                }
                if no_links {
                    continue;
                }
                let found = all_simple_paths::<Vec<NodeIndex>, _>(
                    graph,
                    NodeIndex::new(s),
                    NodeIndex::new(t),
                    0,
                    max_intermediate,
                );
                for path in found {
                    let contribution = path
                        .windows(2)
                        .fold(b[s], |acc, link| acc * w[(link[1].index(), link[0].index())]);
                    effect += contribution;
                    if let Some(paths) = sink.as_deref_mut() {
                        paths.push(SignalPath {
                            nodes: path.iter().map(|v| self.node_name(v.index())).collect(),
                            contribution,
                        });
                    }
                }
            }
            activity[t] = effect;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sources = sources.len(),
            max_path_length = ?self.params.max_path_length(),
            "path summation finished"
        );

        ensure_finite(&activity, "activity")?;
        Ok(activity)
    }

    /// Like [`Propagator::compute`], also returning every enumerated path.
    pub fn compute_with_paths(&mut self, b: &DVector<f64>) -> Result<PathSummation, SignalFlowError> {
        let mut paths = Vec::new();
        let activity = self.wire(b, Some(&mut paths))?;
        Ok(PathSummation { activity, paths })
    }
}

impl Propagator for AcyclicPathSummation {
    fn params(&self) -> &ParameterSet {
        &self.params
    }

    fn weights(&self) -> Option<&DMatrix<f64>> {
        self.weights.as_ref()
    }

    fn replace_weights(&mut self, weights: DMatrix<f64>) -> Result<WeightSnapshot, SignalFlowError> {
        let current = self.require_weights()?;
        if weights.shape() != current.shape() {
            return Err(SignalFlowError::dimension_mismatch(
                "perturbed weight matrix",
                format!("{:?}", current.shape()),
                format!("{:?}", weights.shape()),
            ));
        }
        let previous = std::mem::replace(&mut self.weights, Some(weights))
            .ok_or(SignalFlowError::NotInitialized("weight matrix"))?;
        self.graph = None;
        Ok(WeightSnapshot {
            weights: previous,
            cache: None,
        })
    }

    fn restore_weights(&mut self, snapshot: WeightSnapshot) {
        self.weights = Some(snapshot.weights);
        self.graph = None;
    }

    fn compute(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SignalFlowError> {
        self.wire(b, None)
    }
}

impl Engine for AcyclicPathSummation {
    fn abbr(&self) -> &'static str {
        "APS"
    }

    fn name(&self) -> &'static str {
        "Acyclic path summation algorithm"
    }

    fn set_params(&mut self, params: ParameterSet) -> bool {
        let stale = params.degree_norm() != self.params.degree_norm()
            || Self::weight_scheme(&params) != Self::weight_scheme(&self.params);
        self.params = params;
        stale
    }

    fn build_weights(&mut self, network: &Network) -> Result<(), SignalFlowError> {
        let w = build_weight_matrix(
            network.adjacency(),
            self.params.degree_norm(),
            Self::weight_scheme(&self.params),
        )?;
        self.set_weights(w)?;
        self.names = network.names().to_vec();
        Ok(())
    }

    fn set_weights(&mut self, weights: DMatrix<f64>) -> Result<(), SignalFlowError> {
        ensure_square(&weights, "weight matrix")?;
        self.weights = Some(weights);
        self.graph = None;
        Ok(())
    }
}
