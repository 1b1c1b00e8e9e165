//! Parquet writer for image-to-image training splits.
//!
//! Each row pairs the unrouted ("connection-pair") PNG with the routed PNG
//! and a fixed edit instruction.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, LargeBinaryArray, LargeBinaryBuilder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::ExportError;

/// One training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePairRecord {
    pub id: String,
    /// PNG bytes of the unrouted image.
    pub input_image: Vec<u8>,
    /// PNG bytes of the routed image.
    pub output_image: Vec<u8>,
    pub edit_instruction: String,
}

pub fn image_pair_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("input_image", DataType::LargeBinary, false),
        Field::new("output_image", DataType::LargeBinary, false),
        Field::new("edit_instruction", DataType::Utf8, false),
    ])
}

/// Convert records into an Arrow RecordBatch.
pub fn records_to_record_batch(records: &[ImagePairRecord]) -> Result<RecordBatch, ExportError> {
    let schema = Arc::new(image_pair_schema());

    let mut id = StringBuilder::new();
    let mut input_image = LargeBinaryBuilder::new();
    let mut output_image = LargeBinaryBuilder::new();
    let mut edit_instruction = StringBuilder::new();

    for record in records {
        id.append_value(&record.id);
        input_image.append_value(&record.input_image);
        output_image.append_value(&record.output_image);
        edit_instruction.append_value(&record.edit_instruction);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(id.finish()),
        Arc::new(input_image.finish()),
        Arc::new(output_image.finish()),
        Arc::new(edit_instruction.finish()),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write records to a ZSTD-compressed Parquet file, creating parent dirs.
pub fn write_parquet(records: &[ImagePairRecord], output_path: &Path) -> Result<(), ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoSamples(output_path.display().to_string()));
    }

    let batch = records_to_record_batch(records)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(output_path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    tracing::info!(
        path = %output_path.display(),
        rows = records.len(),
        "Parquet file written"
    );

    Ok(())
}

/// Read records back from a Parquet file written by [`write_parquet`].
pub fn read_parquet(input_path: &Path) -> Result<Vec<ImagePairRecord>, ExportError> {
    let file = std::fs::File::open(input_path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;

        let strings = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|col| col.as_any().downcast_ref::<StringArray>())
                .cloned()
        };
        let binaries = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|col| col.as_any().downcast_ref::<LargeBinaryArray>())
                .cloned()
        };

        let (Some(ids), Some(inputs), Some(outputs), Some(instructions)) = (
            strings("id"),
            binaries("input_image"),
            binaries("output_image"),
            strings("edit_instruction"),
        ) else {
            return Err(ExportError::MalformedRow {
                line: 0,
                reason: format!("{} does not have the image pair schema", input_path.display()),
            });
        };

        for i in 0..batch.num_rows() {
            if ids.is_null(i) {
                continue;
            }
            records.push(ImagePairRecord {
                id: ids.value(i).to_string(),
                input_image: inputs.value(i).to_vec(),
                output_image: outputs.value(i).to_vec(),
                edit_instruction: instructions.value(i).to_string(),
            });
        }
    }

    tracing::info!(
        path = %input_path.display(),
        rows = records.len(),
        "Parquet file loaded"
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ImagePairRecord {
        ImagePairRecord {
            id: id.to_string(),
            input_image: vec![0x89, b'P', b'N', b'G', 1],
            output_image: vec![0x89, b'P', b'N', b'G', 2],
            edit_instruction: "route it".to_string(),
        }
    }

    #[test]
    fn test_schema_fields() {
        let schema = image_pair_schema();
        assert_eq!(schema.fields().len(), 4);
        assert_eq!(
            schema.field_with_name("input_image").unwrap().data_type(),
            &DataType::LargeBinary
        );
    }

    #[test]
    fn test_write_and_read_parquet() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("parquet").join("train.parquet");
        let records = vec![record("sample-000001"), record("sample-000002")];

        write_parquet(&records, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");

        assert_eq!(read_parquet(&path).unwrap(), records);
    }

    #[test]
    fn test_empty_records_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            write_parquet(&[], &tmp.path().join("empty.parquet")),
            Err(ExportError::NoSamples(_))
        ));
    }
}
