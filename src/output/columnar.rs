// src/output/columnar.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{path::Path, sync::Arc};
use tracing::info;

use crate::model::EnrichedRecord;

pub fn consolidated_schema() -> Schema {
    Schema::new(vec![
        Field::new("registro_ans", DataType::UInt64, true),
        Field::new("ano", DataType::Int32, false),
        Field::new("trimestre", DataType::Utf8, false),
        Field::new("valor_despesas", DataType::Float64, false),
        Field::new("descricao", DataType::Utf8, true),
        Field::new("cnpj", DataType::Utf8, true),
        Field::new("razao_social", DataType::Utf8, true),
        Field::new("uf", DataType::Utf8, true),
        Field::new("matched", DataType::Boolean, false),
    ])
}

fn to_batch(schema: Arc<Schema>, records: &[EnrichedRecord]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter(
            records.iter().map(|r| r.record.registry_id.id()),
        )),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.record.year))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.record.quarter.label()),
        )),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.record.amount))),
        Arc::new(StringArray::from_iter(
            records.iter().map(|r| r.record.description.as_deref()),
        )),
        Arc::new(StringArray::from_iter(records.iter().map(|r| r.tax_id.as_deref()))),
        Arc::new(StringArray::from_iter(records.iter().map(|r| r.legal_name.as_deref()))),
        Arc::new(StringArray::from_iter(records.iter().map(|r| r.region.as_deref()))),
        Arc::new(BooleanArray::from_iter(records.iter().map(|r| Some(r.matched)))),
    ];
    RecordBatch::try_new(schema, columns).context("building consolidated record batch")
}

/// Enriched table as a single Snappy-compressed Parquet file.
pub fn write_consolidated_parquet(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let schema = Arc::new(consolidated_schema());
    let batch = to_batch(schema.clone(), records)?;

    super::write_atomically(path, |out| {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(out, schema, Some(props))
            .context("creating Arrow writer for consolidated table")?;
        writer.write(&batch).context("writing consolidated batch")?;
        writer.close().context("closing consolidated writer")?;
        Ok(())
    })?;

    info!(path = %path.display(), rows = records.len(), "wrote consolidated parquet");
    Ok(())
}
