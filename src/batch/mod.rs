//! Batch dataset generation.
//!
//! - [`driver`]: worker pool, collector and run orchestration
//! - [`client`]: HTTP and in-process sample clients
//! - [`progress`]: run counters and throughput logging
//! - [`output`]: `dataset.jsonl`, `metadata.json` and `failures.json`

pub mod client;
pub mod driver;
pub mod output;
pub mod progress;

pub use client::{HttpSampleClient, LocalSampleClient, SampleClient};
pub use driver::{
    pair_count_for_index, request_for_index, run_batch, sample_id_for, BatchConfig, BatchSummary,
};
pub use output::{FailureRecord, RunMetadata, DATASET_FILE, FAILURES_FILE, METADATA_FILE};
pub use progress::{BatchStats, ProgressSnapshot};
