//! The signal flow engine.
//!
//! This module provides:
//! - **errors**: Error types for configuration and numerical failures
//! - **network** / **dataset** / **table**: Signed networks and perturbation data
//! - **weights**: Weight-matrix construction and degree normalization
//! - **solver** / **models**: Exact and iterative solvers per propagation model
//! - **propagation** / **paths**: Engines holding weights and solver caches
//! - **perturbation** / **batch**: The per-condition simulation protocol
//! - **algorithm**: The public algorithm lifecycle
//! - **influence**: Influence matrices and perturbation analysis

pub mod algorithm;
pub mod batch;
pub mod dataset;
pub mod errors;
pub mod influence;
pub mod models;
pub mod network;
pub mod params;
pub mod paths;
pub mod perturbation;
pub mod propagation;
pub mod solver;
pub mod table;
pub mod weights;
