//! Bounded-concurrency batch driver.
//!
//! `concurrency` worker tasks claim 1-based sample indices from a shared
//! atomic cursor until it passes `sample_count`. Each index produces exactly
//! one outcome, sent over a channel to a single collector task that owns the
//! rows, failures and counters. No lock is held across an await.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::client::SampleClient;
use super::output::{self, FailureRecord, RunMetadata};
use super::progress::BatchStats;
use crate::orchestrator::{persist_sample, DatasetRow};
use crate::service::GenerateRequest;

pub const BATCH_TRACE_THICKNESS_MM: f64 = 0.1;
pub const BATCH_VIA_DIAMETER_MM: f64 = 0.3;
pub const BATCH_TRACE_MARGIN_MM: f64 = 0.1;
pub const BATCH_MIN_POINT_SEPARATION_MM: f64 = 0.5;
pub const BATCH_CELL_SIZE_MM: f64 = 0.1;
pub const BATCH_MAX_SOLVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub sample_count: usize,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub seed_offset: i64,
    /// PNG width in pixels; height follows the SVG aspect ratio.
    pub image_width: u32,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub rows: Vec<DatasetRow>,
    pub failures: Vec<FailureRecord>,
    pub metadata: RunMetadata,
    pub dataset_path: PathBuf,
    pub failures_path: Option<PathBuf>,
}

/// `sample-000042` for index 42.
pub fn sample_id_for(index: usize) -> String {
    format!("sample-{:06}", index)
}

/// Deterministic pair count in `[2, 10]` for a sample index.
pub fn pair_count_for_index(index: usize) -> u32 {
    let mixed = (index as u32)
        .wrapping_mul(1_103_515_245)
        .wrapping_add(12_345);
    let h = (mixed >> 16) & 0x7fff;
    2 + h % 9
}

/// The request the driver sends for `index`.
pub fn request_for_index(index: usize, seed_offset: i64) -> GenerateRequest {
    GenerateRequest {
        problem_id: sample_id_for(index),
        seed: seed_offset.saturating_add(index as i64),
        pair_count: pair_count_for_index(index),
        min_point_separation_mm: BATCH_MIN_POINT_SEPARATION_MM,
        cell_size_mm: BATCH_CELL_SIZE_MM,
        via_diameter_mm: BATCH_VIA_DIAMETER_MM,
        trace_thickness_mm: BATCH_TRACE_THICKNESS_MM,
        trace_margin_mm: BATCH_TRACE_MARGIN_MM,
        max_solve_attempts: BATCH_MAX_SOLVE_ATTEMPTS,
    }
}

/// Result of one claimed index.
#[derive(Debug)]
enum SampleOutcome {
    Generated {
        row: DatasetRow,
        attempts: u32,
        cached: bool,
    },
    Failed {
        record: FailureRecord,
        /// `None` when the service never answered.
        cached: Option<bool>,
    },
}

/// Run the batch and write `dataset.jsonl`, `metadata.json` and, when
/// needed, `failures.json` into `config.output_dir`.
pub async fn run_batch(
    config: BatchConfig,
    client: Arc<dyn SampleClient>,
) -> anyhow::Result<BatchSummary> {
    if config.concurrency == 0 {
        bail!("concurrency must be at least 1");
    }
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let started_at = Utc::now();
    let start = Instant::now();
    info!(
        sample_count = config.sample_count,
        concurrency = config.concurrency,
        endpoint = client.endpoint(),
        output_dir = %config.output_dir.display(),
        "Starting batch run"
    );

    let cursor = Arc::new(AtomicUsize::new(1));
    let (tx, mut rx) = mpsc::channel::<SampleOutcome>(config.concurrency * 2);

    let target = config.sample_count;
    let collector = tokio::spawn(async move {
        let mut stats = BatchStats::new(target);
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        while let Some(outcome) = rx.recv().await {
            match outcome {
                SampleOutcome::Generated {
                    row,
                    attempts,
                    cached,
                } => {
                    stats.record_lookup(cached);
                    stats.record_success(attempts);
                    rows.push(row);
                }
                SampleOutcome::Failed { record, cached } => {
                    if let Some(cached) = cached {
                        stats.record_lookup(cached);
                    }
                    stats.record_failure();
                    failures.push(record);
                }
            }
            stats.maybe_log();
        }
        (rows, failures, stats)
    });

    let mut workers = Vec::with_capacity(config.concurrency);
    for worker in 0..config.concurrency {
        let cursor = cursor.clone();
        let client = client.clone();
        let tx = tx.clone();
        let config = config.clone();
        workers.push(tokio::spawn(async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index > config.sample_count {
                    break;
                }
                let outcome = process_sample(index, &config, client.as_ref()).await;
                if tx.send(outcome).await.is_err() {
                    warn!(worker = worker, "Collector stopped early");
                    break;
                }
            }
            debug!(worker = worker, "Worker finished");
        }));
    }
    drop(tx);

    for result in futures::future::join_all(workers).await {
        result.context("Batch worker panicked")?;
    }
    let (mut rows, mut failures, stats) = collector.await.context("Collector task panicked")?;

    let finished_at = Utc::now();
    let snap = stats.snapshot();
    let elapsed = start.elapsed().as_secs_f64();

    let dataset_path = output::write_dataset(&config.output_dir, &mut rows)?;
    let failures_path = output::write_failures(&config.output_dir, &mut failures)?;

    let metadata = RunMetadata {
        run_id: uuid::Uuid::new_v4().to_string(),
        sample_count: config.sample_count,
        generated_samples: rows.len(),
        failed_samples: failures.len(),
        concurrency: config.concurrency,
        endpoint: client.endpoint().to_string(),
        seed_offset: config.seed_offset,
        image_width: config.image_width,
        started_at,
        finished_at,
        elapsed_seconds: elapsed,
        samples_per_second: if elapsed > 0.0 {
            snap.completed as f64 / elapsed
        } else {
            0.0
        },
        cache_hits: snap.cache_hits,
        cache_misses: snap.cache_misses,
        cache_hit_ratio: snap.cache_hit_ratio(),
        total_solver_attempts: snap.total_attempts,
        average_solver_attempts: snap.average_attempts(),
    };
    output::write_metadata(&config.output_dir, &metadata)?;

    stats.log();
    if failures.is_empty() {
        info!(
            generated = rows.len(),
            dataset = %dataset_path.display(),
            "Batch run complete"
        );
    } else {
        warn!(
            generated = rows.len(),
            failed = failures.len(),
            dataset = %dataset_path.display(),
            "Batch run complete with failures, see failures.json"
        );
    }

    Ok(BatchSummary {
        rows,
        failures,
        metadata,
        dataset_path,
        failures_path,
    })
}

async fn process_sample(
    index: usize,
    config: &BatchConfig,
    client: &dyn SampleClient,
) -> SampleOutcome {
    let request = request_for_index(index, config.seed_offset);
    let id = request.problem_id.clone();
    let failed = |reason: String, cached: Option<bool>| {
        warn!(sample_id = %id, reason = %reason, "Sample failed");
        SampleOutcome::Failed {
            record: FailureRecord {
                problem_id: id.clone(),
                reason,
            },
            cached,
        }
    };

    let response = match client.generate(&request).await {
        Ok(response) => response,
        Err(e) => return failed(e.to_string(), None),
    };
    let cached = response.cached;
    if !response.ok {
        let reason = response
            .reason
            .unwrap_or_else(|| "service reported failure".to_string());
        return failed(reason, Some(cached));
    }
    let Some(sample) = response.sample else {
        return failed("response has no sample".to_string(), Some(cached));
    };

    let output_dir = config.output_dir.clone();
    let image_width = config.image_width;
    let sample_id = id.clone();
    let persisted = tokio::task::spawn_blocking(move || {
        persist_sample(sample, &sample_id, Path::new(&output_dir), image_width)
    })
    .await;

    match persisted {
        Ok(Ok(row)) => {
            debug!(sample_id = %id, attempts = response.attempts, cached = cached, "Sample generated");
            SampleOutcome::Generated {
                row,
                attempts: response.attempts,
                cached,
            }
        }
        Ok(Err(e)) => failed(format!("rendering failed: {}", e), Some(cached)),
        Err(e) => failed(format!("rendering task failed: {}", e), Some(cached)),
    }
}
