//! Train/test split of a generated dataset into Parquet files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::parquet_writer::{write_parquet, ImagePairRecord};
use crate::batch::output::{read_dataset, read_failures, DATASET_FILE};
use crate::error::ExportError;
use crate::orchestrator::DatasetRow;

/// Instruction paired with every image in the exported splits.
pub const EDIT_INSTRUCTION: &str = "Route the traces between the color matched pins, using red for the top layer and blue for the bottom layer.  Add vias to keep traces of the same color from crossing.";

pub const DEFAULT_TEST_RATIO: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;
pub const PARQUET_DIR: &str = "parquet";

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub dataset_dir: PathBuf,
    pub test_ratio: f64,
    pub seed: u64,
}

impl SplitConfig {
    pub fn new(dataset_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            test_ratio: DEFAULT_TEST_RATIO,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub train_ids: Vec<String>,
    pub test_ids: Vec<String>,
    /// `None` when the split was empty and nothing was written.
    pub train_path: Option<PathBuf>,
    pub test_path: Option<PathBuf>,
    pub skipped: usize,
}

/// Deterministically split ids into `(train, test)`, both sorted.
///
/// At least one id lands in train.
pub fn split_ids(mut ids: Vec<String>, test_ratio: f64, seed: u64) -> (Vec<String>, Vec<String>) {
    ids.sort();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    ids.shuffle(&mut rng);

    let n = ids.len();
    let split = ((n as f64 * (1.0 - test_ratio)).floor() as usize)
        .max(1)
        .min(n);
    let mut test = ids.split_off(split);
    let mut train = ids;
    train.sort();
    test.sort();
    (train, test)
}

/// Build `parquet/train.parquet` and `parquet/test.parquet` under the
/// dataset directory.
pub fn export_splits(config: &SplitConfig) -> Result<SplitSummary, ExportError> {
    if !(0.0..1.0).contains(&config.test_ratio) {
        return Err(ExportError::InvalidTestRatio(config.test_ratio));
    }

    let dir = &config.dataset_dir;
    let rows = read_dataset(&dir.join(DATASET_FILE))?;
    let failed: HashSet<String> = read_failures(dir)?
        .into_iter()
        .map(|f| f.problem_id)
        .collect();

    let total = rows.len();
    let valid: Vec<DatasetRow> = rows
        .into_iter()
        .filter(|row| !failed.contains(&row.id))
        .filter(|row| {
            let present = dir.join(&row.connection_pair_image).is_file()
                && dir.join(&row.routed_image).is_file();
            if !present {
                warn!(id = %row.id, "Skipping sample with missing images");
            }
            present
        })
        .collect();

    if valid.is_empty() {
        return Err(ExportError::NoSamples(dir.display().to_string()));
    }
    let skipped = total - valid.len();

    let ids = valid.iter().map(|row| row.id.clone()).collect();
    let (train_ids, test_ids) = split_ids(ids, config.test_ratio, config.seed);

    let parquet_dir = dir.join(PARQUET_DIR);
    let train_path = write_split(&valid, &train_ids, dir, &parquet_dir.join("train.parquet"))?;
    let test_path = write_split(&valid, &test_ids, dir, &parquet_dir.join("test.parquet"))?;

    info!(
        train = train_ids.len(),
        test = test_ids.len(),
        skipped = skipped,
        "Dataset splits exported"
    );

    Ok(SplitSummary {
        train_ids,
        test_ids,
        train_path,
        test_path,
        skipped,
    })
}

fn write_split(
    rows: &[DatasetRow],
    ids: &[String],
    dataset_dir: &Path,
    path: &Path,
) -> Result<Option<PathBuf>, ExportError> {
    if ids.is_empty() {
        return Ok(None);
    }
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut records = Vec::with_capacity(ids.len());
    for row in rows.iter().filter(|r| wanted.contains(r.id.as_str())) {
        records.push(ImagePairRecord {
            id: row.id.clone(),
            input_image: std::fs::read(dataset_dir.join(&row.connection_pair_image))?,
            output_image: std::fs::read(dataset_dir.join(&row.routed_image))?,
            edit_instruction: EDIT_INSTRUCTION.to_string(),
        });
    }
    records.sort_by(|a, b| a.id.cmp(&b.id));
    write_parquet(&records, path)?;
    Ok(Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::output::{write_dataset, write_failures, FailureRecord};
    use crate::export::read_parquet;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("sample-{:06}", i)).collect()
    }

    fn seed_dataset(dir: &Path, n: usize, missing_png: &[usize]) {
        let mut rows = Vec::new();
        for (i, id) in ids(n).into_iter().enumerate() {
            let row = DatasetRow {
                id: id.clone(),
                boundary_connection_pairs: Vec::new(),
                connection_pair_image: format!("images/connection-pairs/{}.png", id),
                routed_image: format!("images/routed/{}.png", id),
                routed_paths: Vec::new(),
            };
            if !missing_png.contains(&(i + 1)) {
                for rel in [&row.connection_pair_image, &row.routed_image] {
                    let path = dir.join(rel);
                    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                    std::fs::write(path, id.as_bytes()).unwrap();
                }
            }
            rows.push(row);
        }
        write_dataset(dir, &mut rows).unwrap();
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let (train, test) = split_ids(ids(10), 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert!(train.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(split_ids(ids(10), 0.2, 42), (train, test));

        let (train, test) = split_ids(ids(1), 0.9, 42);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }

    #[test]
    fn test_export_skips_failures_and_missing_images() {
        let tmp = tempfile::tempdir().unwrap();
        seed_dataset(tmp.path(), 6, &[2]);
        let mut failures = vec![FailureRecord {
            problem_id: "sample-000005".to_string(),
            reason: "no solution".to_string(),
        }];
        write_failures(tmp.path(), &mut failures).unwrap();

        let summary = export_splits(&SplitConfig::new(tmp.path())).unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.train_ids.len() + summary.test_ids.len(), 4);
        assert_eq!(summary.train_ids.len(), 3);

        let train = read_parquet(summary.train_path.as_ref().unwrap()).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(train[0].edit_instruction, EDIT_INSTRUCTION);
        assert_eq!(train[0].input_image, train[0].id.as_bytes());
    }

    #[test]
    fn test_export_rejects_bad_ratio_and_empty_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        seed_dataset(tmp.path(), 2, &[1, 2]);

        let mut config = SplitConfig::new(tmp.path());
        config.test_ratio = 1.0;
        assert!(matches!(
            export_splits(&config),
            Err(ExportError::InvalidTestRatio(_))
        ));

        assert!(matches!(
            export_splits(&SplitConfig::new(tmp.path())),
            Err(ExportError::NoSamples(_))
        ));
    }
}
