//! Dataset export to Parquet training splits.

pub mod parquet_writer;
pub mod split;

pub use parquet_writer::{image_pair_schema, read_parquet, write_parquet, ImagePairRecord};
pub use split::{export_splits, split_ids, SplitConfig, SplitSummary, EDIT_INSTRUCTION};
