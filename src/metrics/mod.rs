//! Metrics module for Prometheus-based monitoring of the sample service.
//!
//! # Example
//!
//! ```ignore
//! use route_forge::metrics::{init_metrics, export_metrics, record_generate};
//!
//! init_metrics()?;
//! record_generate("ok");
//! let metrics_text = export_metrics();
//! ```

pub mod prometheus;

pub use self::prometheus::{
    export_metrics, init_metrics, metrics_handler, observe_solve_duration, record_cache_lookup,
    record_generate,
};

pub use self::prometheus::{CACHE_LOOKUPS_TOTAL, GENERATE_REQUESTS_TOTAL, REGISTRY, SOLVE_DURATION};
