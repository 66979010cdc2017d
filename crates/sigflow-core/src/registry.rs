//! Name → factory table for signal flow algorithms.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::engine::algorithm::{
    AcyclicPathSummationAlgorithm, CyclicPathSummationAlgorithm, GaussianSmoothingAlgorithm,
    NormalizedGaussianSmoothingAlgorithm, SignalFlowAlgorithm, SignalPropagationAlgorithm,
};
use crate::engine::models::{
    CyclicPathSummation, GaussianSmoothing, NormalizedGaussianSmoothing, SignalPropagation,
};

/// Builds a fresh, uninitialized algorithm instance.
pub type AlgorithmFactory = Arc<dyn Fn() -> Box<dyn SignalFlowAlgorithm> + Send + Sync>;

/// Explicit registry of algorithm factories. Lookups are case-insensitive.
#[derive(Default, Clone)]
pub struct AlgorithmRegistry {
    inner: FxHashMap<String, AlgorithmFactory>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `SP`, `GS`, `NGS`, `CPS` and `APS`.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register("SP", || {
            Box::new(SignalPropagationAlgorithm::from_model(SignalPropagation))
        });
        r.register("GS", || {
            Box::new(GaussianSmoothingAlgorithm::from_model(GaussianSmoothing))
        });
        r.register("NGS", || {
            Box::new(NormalizedGaussianSmoothingAlgorithm::from_model(
                NormalizedGaussianSmoothing,
            ))
        });
        r.register("CPS", || {
            Box::new(CyclicPathSummationAlgorithm::from_model(CyclicPathSummation))
        });
        r.register("APS", || Box::new(AcyclicPathSummationAlgorithm::path_summation()));
        r
    }

    /// Registers `factory` under `name`, replacing an existing entry.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn SignalFlowAlgorithm> + Send + Sync + 'static,
    {
        self.inner.insert(name.to_ascii_uppercase(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_uppercase())
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn SignalFlowAlgorithm>> {
        self.inner.get(&name.to_ascii_uppercase()).map(|f| f())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("names", &self.names())
            .finish()
    }
}
