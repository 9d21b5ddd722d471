// src/output/delimited.rs

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::{fs, io::Write, path::Path};
use tracing::info;

use super::write_atomically;
use crate::model::{AggregateRow, EnrichedRecord, FinancialRecord, Quarter};
use crate::process::{normalize_key, utils::{coerce_amount, non_empty}};

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CONSOLIDATED_HEADER: [&str; 8] = [
    "RegistroANS",
    "Ano",
    "Trimestre",
    "Valor Despesas",
    "Descricao",
    "CNPJ",
    "RazaoSocial",
    "UF",
];

pub const AGGREGATES_HEADER: [&str; 6] = [
    "RazaoSocial",
    "UF",
    "Valor_Total",
    "Media_Trimestral",
    "Desvio_Padrao",
    "Qtd_Registros",
];

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

/// One `;`-delimited row per record, UTF-8 with a BOM so spreadsheet tools
/// pick the right encoding.
pub fn write_consolidated(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    write_atomically(path, |out| {
        out.write_all(BOM)?;
        let mut w = WriterBuilder::new().delimiter(b';').from_writer(out);
        w.write_record(CONSOLIDATED_HEADER)?;
        for rec in records {
            let r = &rec.record;
            w.write_record([
                r.registry_id.to_string(),
                r.year.to_string(),
                r.quarter.label().to_string(),
                money(r.amount),
                r.description.clone().unwrap_or_default(),
                rec.tax_id.clone().unwrap_or_default(),
                rec.legal_name.clone().unwrap_or_default(),
                rec.region.clone().unwrap_or_default(),
            ])?;
        }
        w.flush()?;
        Ok(())
    })
    .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "wrote consolidated csv");
    Ok(())
}

pub fn write_aggregates(path: &Path, rows: &[AggregateRow]) -> Result<()> {
    write_atomically(path, |out| {
        out.write_all(BOM)?;
        let mut w = WriterBuilder::new().delimiter(b';').from_writer(out);
        w.write_record(AGGREGATES_HEADER)?;
        for row in rows {
            w.write_record([
                row.legal_name.clone(),
                row.region.clone(),
                money(row.total),
                money(row.mean),
                money(row.stddev),
                row.count.to_string(),
            ])?;
        }
        w.flush()?;
        Ok(())
    })
    .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), groups = rows.len(), "wrote aggregate csv");
    Ok(())
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    match headers.iter().position(|h| h.trim() == name) {
        Some(i) => Ok(i),
        None => bail!("column {} missing; header is {:?}", name, headers),
    }
}

/// Read a consolidated file back. Inverse of [`write_consolidated`]; a row
/// counts as matched when any registry field is filled.
pub fn read_consolidated(path: &Path) -> Result<Vec<EnrichedRecord>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes);

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(body);
    let headers = rdr.headers().context("reading consolidated header")?.clone();
    let key_col = column(&headers, "RegistroANS")?;
    let year_col = column(&headers, "Ano")?;
    let quarter_col = column(&headers, "Trimestre")?;
    let amount_col = column(&headers, "Valor Despesas")?;
    let desc_col = column(&headers, "Descricao")?;
    let tax_col = column(&headers, "CNPJ")?;
    let name_col = column(&headers, "RazaoSocial")?;
    let region_col = column(&headers, "UF")?;

    let mut out = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("{} record {}", path.display(), line + 1))?;
        let cell = |i: usize| row.get(i).unwrap_or("");

        let quarter = Quarter::from_label(cell(quarter_col)).with_context(|| {
            format!("record {}: bad quarter {:?}", line + 1, cell(quarter_col))
        })?;
        let year = cell(year_col)
            .trim()
            .parse::<i32>()
            .with_context(|| format!("record {}: bad year {:?}", line + 1, cell(year_col)))?;

        let tax_id = non_empty(cell(tax_col));
        let legal_name = non_empty(cell(name_col));
        let region = non_empty(cell(region_col));
        out.push(EnrichedRecord {
            record: FinancialRecord {
                registry_id: normalize_key(cell(key_col)),
                year,
                quarter,
                amount: coerce_amount(cell(amount_col)),
                description: non_empty(cell(desc_col)),
            },
            matched: tax_id.is_some() || legal_name.is_some() || region.is_some(),
            tax_id,
            legal_name,
            region,
        });
    }

    info!(path = %path.display(), rows = out.len(), "read consolidated csv");
    Ok(out)
}
