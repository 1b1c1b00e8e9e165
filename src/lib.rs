//! route-forge: PCB trace-routing image dataset generation.
//!
//! This library synthesizes two-layer routing problems, solves them behind a
//! content-addressed cache, renders before/after images, and assembles the
//! results into a reproducible dataset.

// Core modules
pub mod batch;
pub mod cache;
pub mod cli;
pub mod error;
pub mod export;
pub mod geometry;
pub mod metrics;
pub mod orchestrator;
pub mod problem;
pub mod render;
pub mod service;
pub mod solver;

// Re-export commonly used error types
pub use error::{
    CacheError, ClientError, ExportError, RenderError, RequestError, SolveError, SolverError,
    SynthesisError,
};
