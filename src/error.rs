//! Error types for route-forge operations.
//!
//! Defines error types for the major subsystems:
//! - Request validation at the service boundary
//! - Problem synthesis and routing
//! - SVG rendering and rasterization
//! - Cache storage backends
//! - The batch driver's HTTP client
//! - Dataset export

use thiserror::Error;

/// Errors raised while validating a `/generate` request body.
///
/// These map to HTTP 400 and are never retried.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("problemId is required and must be a non-empty string")]
    MissingProblemId,

    #[error("seed is required and must be a finite number")]
    InvalidSeed,

    #[error("Field '{field}' must be a finite number")]
    InvalidNumber { field: String },

    #[error("Field '{field}' must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Errors raised by problem synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Could not place {requested} ports with {separation_mm} mm separation on the board perimeter")]
    PortPlacement { requested: usize, separation_mm: f64 },

    #[error("Invalid synthesis parameter: {0}")]
    InvalidParameter(String),
}

/// Errors reported by a routing solver invocation itself.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),

    #[error("Port '{0}' referenced by a connection pair does not exist")]
    UnknownPort(String),

    #[error("Solver panicked: {0}")]
    Panicked(String),
}

/// Errors that make a solve attempt fail.
///
/// The `Display` output of each variant is the `reason` string reported
/// to clients, so keep the messages short and stable.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solver threw")]
    SolverThrew(#[source] SolverError),

    #[error("{0}")]
    NoSolution(String),

    #[error("expected {expected} routed paths, got {actual}")]
    IncompletePaths { expected: usize, actual: usize },

    #[error("problem synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("invalid problem: {0}")]
    InvalidProblem(String),
}

/// Errors that can occur while rendering SVG documents or PNG images.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("SVG parse error: {0}")]
    SvgParse(String),

    #[error("Invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from cache store backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Unsupported cache URL '{0}': expected memory://, sqlite://<path> or redis://...")]
    UnsupportedUrl(String),

    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("SQLite operation failed: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when the batch driver talks to the sample service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Errors that can occur during dataset export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No valid samples to export in '{0}'")]
    NoSamples(String),

    #[error("Invalid test ratio {0}: must be within [0, 1)")]
    InvalidTestRatio(f64),

    #[error("Malformed dataset line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
