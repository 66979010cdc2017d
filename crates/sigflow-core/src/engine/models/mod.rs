//! Propagation models.
//!
//! Each model derives its exact operator and its fixed-point coefficients from
//! the weight matrix; the caching discipline lives in
//! [`NetworkPropagation`](crate::engine::propagation::NetworkPropagation).

pub mod cyclic;
pub mod signal_propagation;
pub mod smoothing;

pub use cyclic::CyclicPathSummation;
pub use signal_propagation::SignalPropagation;
pub use smoothing::{GaussianSmoothing, NormalizedGaussianSmoothing};
