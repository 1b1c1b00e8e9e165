//! Dataset files written at the end of a batch run.
//!
//! Layout under the output directory:
//! - `dataset.jsonl`: one [`DatasetRow`] per line, sorted by id
//! - `metadata.json`: [`RunMetadata`]
//! - `failures.json`: [`FailureRecord`] array, only when something failed

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::orchestrator::DatasetRow;

pub const DATASET_FILE: &str = "dataset.jsonl";
pub const METADATA_FILE: &str = "metadata.json";
pub const FAILURES_FILE: &str = "failures.json";

/// A sample that did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub problem_id: String,
    pub reason: String,
}

/// Run statistics written to `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub sample_count: usize,
    pub generated_samples: usize,
    pub failed_samples: usize,
    pub concurrency: usize,
    pub endpoint: String,
    pub seed_offset: i64,
    pub image_width: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub samples_per_second: f64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_hit_ratio: f64,
    pub total_solver_attempts: u64,
    pub average_solver_attempts: f64,
}

/// Sort `rows` by id and write them as JSON lines.
pub fn write_dataset(output_dir: &Path, rows: &mut [DatasetRow]) -> anyhow::Result<PathBuf> {
    rows.sort_by(|a, b| a.id.cmp(&b.id));

    let path = output_dir.join(DATASET_FILE);
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in rows.iter() {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn write_metadata(output_dir: &Path, metadata: &RunMetadata) -> anyhow::Result<PathBuf> {
    let path = output_dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write `failures.json` sorted by problem id. With no failures nothing is
/// written and a stale file from an earlier run is removed.
pub fn write_failures(
    output_dir: &Path,
    failures: &mut [FailureRecord],
) -> anyhow::Result<Option<PathBuf>> {
    let path = output_dir.join(FAILURES_FILE);
    if failures.is_empty() {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale {}", path.display()))?;
        }
        return Ok(None);
    }

    failures.sort_by(|a, b| a.problem_id.cmp(&b.problem_id));
    let json = serde_json::to_string_pretty(failures)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}

/// Read `dataset.jsonl`, skipping blank lines.
pub fn read_dataset(path: &Path) -> Result<Vec<DatasetRow>, ExportError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|e| ExportError::MalformedRow {
            line: index + 1,
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read `failures.json` from `output_dir`; a missing file means no failures.
pub fn read_failures(output_dir: &Path) -> Result<Vec<FailureRecord>, ExportError> {
    let path = output_dir.join(FAILURES_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> DatasetRow {
        DatasetRow {
            id: id.to_string(),
            boundary_connection_pairs: Vec::new(),
            connection_pair_image: format!("images/connection-pairs/{}.png", id),
            routed_image: format!("images/routed/{}.png", id),
            routed_paths: Vec::new(),
        }
    }

    #[test]
    fn test_dataset_written_sorted_and_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let mut rows = vec![row("sample-000004"), row("sample-000001"), row("sample-000002")];

        let path = write_dataset(tmp.path(), &mut rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);

        let ids: Vec<String> = read_dataset(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["sample-000001", "sample-000002", "sample-000004"]);
    }

    #[test]
    fn test_failures_file_only_when_non_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut failures = vec![
            FailureRecord {
                problem_id: "sample-000005".to_string(),
                reason: "no solution".to_string(),
            },
            FailureRecord {
                problem_id: "sample-000003".to_string(),
                reason: "HTTP 500: boom".to_string(),
            },
        ];
        assert!(write_failures(tmp.path(), &mut failures).unwrap().is_some());

        let read = read_failures(tmp.path()).unwrap();
        assert_eq!(read[0].problem_id, "sample-000003");

        let text = std::fs::read_to_string(tmp.path().join(FAILURES_FILE)).unwrap();
        assert!(text.contains("\"problemId\""));

        assert!(write_failures(tmp.path(), &mut []).unwrap().is_none());
        assert!(!tmp.path().join(FAILURES_FILE).exists());
        assert!(read_failures(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DATASET_FILE);
        std::fs::write(&path, "\n{\"id\": 3}\n").unwrap();
        assert!(matches!(
            read_dataset(&path),
            Err(ExportError::MalformedRow { line: 2, .. })
        ));
    }
}
