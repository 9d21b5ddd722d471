// src/pipeline.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::{error, info, instrument, warn};

use crate::analysis::{aggregate, clean_records};
use crate::config::PipelineConfig;
use crate::enrich::{enrich, passthrough};
use crate::error::{Degraded, SkipReason};
use crate::ingest::{load_tree, read_table};
use crate::model::{AggregateRow, EnrichedRecord, FinancialRecord};
use crate::output::{self, write_json};
use crate::process::{canonicalize_ledger, canonicalize_registry, deduplicate, CanonicalRegistry, ExpenseFilter};
use crate::schema::map_columns;

pub const EXIT_DEGRADED: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub source: String,
    pub reason: SkipReason,
}

/// What one run did, stage by stage. Written next to the outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub files_seen: usize,
    pub files_read: usize,
    pub skipped: Vec<SkippedSource>,
    pub raw_rows: usize,
    pub filtered_rows: usize,
    pub registry_rows: usize,
    pub invalid_registry_keys: usize,
    pub duplicates_collapsed: usize,
    pub enriched_records: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub invalid_keys: usize,
    pub clean_records: usize,
    pub aggregate_groups: usize,
    pub degraded: Option<Degraded>,
}

impl PipelineReport {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Process exit status for this run: 0, or [`EXIT_DEGRADED`] when the
    /// outputs were written without registry data.
    pub fn exit_status(&self) -> u8 {
        if self.is_degraded() {
            EXIT_DEGRADED
        } else {
            0
        }
    }
}

/// Ingest, map, filter and canonicalize every ledger file under `input_dir`.
#[instrument(level = "info", skip_all)]
pub fn collect_ledger(cfg: &PipelineConfig, report: &mut PipelineReport) -> Result<Vec<FinancialRecord>> {
    let sources = load_tree(&cfg.input_dir, cfg.sniff_sample_bytes)?;
    let filter = ExpenseFilter::new(&cfg.expense_keywords);
    report.files_seen = sources.len();

    let mut records = Vec::new();
    for src in sources {
        let table = match src.outcome {
            Ok(t) => t,
            Err(reason) => {
                report.skipped.push(SkippedSource { source: src.name, reason });
                continue;
            }
        };
        report.files_read += 1;
        report.raw_rows += table.len();

        let columns = map_columns(&table.headers);
        let kept = match filter.apply(&table) {
            Ok(t) => t,
            Err(reason) => {
                report.skipped.push(SkippedSource { source: src.name, reason });
                continue;
            }
        };
        report.filtered_rows += kept.len();
        records.extend(canonicalize_ledger(
            &kept,
            &columns,
            cfg.fallback_year,
            cfg.fallback_quarter,
        ));
    }

    info!(
        files = report.files_seen,
        read = report.files_read,
        skipped = report.skipped.len(),
        raw_rows = report.raw_rows,
        records = records.len(),
        "ledger collected"
    );
    Ok(records)
}

/// Read and canonicalize the registry file. Any structural problem comes
/// back as [`Degraded`] so the caller can carry on un-enriched.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_registry(path: &Path, sample_bytes: usize) -> Result<CanonicalRegistry, Degraded> {
    let shown = path.display().to_string();
    if !path.is_file() {
        return Err(Degraded::RegistryMissing { path: shown });
    }
    let bytes = fs::read(path).map_err(|e| Degraded::RegistryUnreadable {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    let table = match read_table(&bytes, &shown, sample_bytes) {
        Ok(t) => t,
        Err(SkipReason::Empty) => return Err(Degraded::RegistryEmpty { path: shown }),
        Err(reason) => {
            return Err(Degraded::RegistryUnreadable {
                path: shown,
                reason: reason.to_string(),
            })
        }
    };

    let columns = map_columns(&table.headers);
    let registry = canonicalize_registry(&table, &columns).ok_or_else(|| {
        Degraded::RegistryKeyColumnMissing {
            path: shown.clone(),
            available: table.headers.clone(),
        }
    })?;
    if registry.entries.is_empty() {
        return Err(Degraded::RegistryEmpty { path: shown });
    }
    Ok(registry)
}

/// Validate, aggregate and write the aggregate CSV and its archive.
pub fn write_aggregate_outputs(records: &[EnrichedRecord], output_dir: &Path) -> Result<(usize, Vec<AggregateRow>)> {
    let clean = clean_records(records);
    let rows = aggregate(clean.iter().copied());
    info!(clean = clean.len(), groups = rows.len(), "aggregated");

    let csv_path = output_dir.join(output::AGGREGATES_CSV);
    output::write_aggregates(&csv_path, &rows)?;
    output::zip_single_file(&csv_path, &output_dir.join(output::AGGREGATES_ZIP))?;
    Ok((clean.len(), rows))
}

/// One full batch run. Only I/O failures on the output side are errors;
/// everything upstream is absorbed into the report.
#[instrument(level = "info", skip_all, fields(input = %cfg.input_dir.display()))]
pub fn run(cfg: &PipelineConfig) -> Result<PipelineReport> {
    let mut report = PipelineReport::default();
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating output directory {}", cfg.output_dir.display()))?;

    // ─── ledger ──────────────────────────────────────────────────────────
    let records = collect_ledger(cfg, &mut report)?;

    // ─── registry & join ─────────────────────────────────────────────────
    let enriched = match load_registry(&cfg.registry_path, cfg.sniff_sample_bytes) {
        Ok(registry) => {
            report.registry_rows = registry.entries.len();
            report.invalid_registry_keys = registry.invalid_keys;
            let unique = deduplicate(&registry.entries);
            report.duplicates_collapsed = registry.entries.len() - unique.len();

            let (enriched, stats) = enrich(&records, &unique);
            report.matched = stats.matched;
            report.unmatched = stats.unmatched;
            report.invalid_keys = stats.invalid_keys;
            enriched
        }
        Err(degraded) => {
            error!(%degraded, "registry unusable; continuing without enrichment");
            report.unmatched = records.len();
            report.degraded = Some(degraded);
            passthrough(&records)
        }
    };
    report.enriched_records = enriched.len();

    // ─── outputs ─────────────────────────────────────────────────────────
    let out = &cfg.output_dir;
    let csv_path = out.join(output::CONSOLIDATED_CSV);
    output::write_consolidated(&csv_path, &enriched)?;
    output::zip_single_file(&csv_path, &out.join(output::CONSOLIDATED_ZIP))?;
    if cfg.write_parquet {
        output::write_consolidated_parquet(&out.join(output::CONSOLIDATED_PARQUET), &enriched)?;
    }

    let (clean, rows) = write_aggregate_outputs(&enriched, out)?;
    report.clean_records = clean;
    report.aggregate_groups = rows.len();

    if enriched.is_empty() {
        warn!("run produced no records");
    }
    write_json(&out.join(output::REPORT_JSON), &report)?;
    info!(
        records = report.enriched_records,
        matched = report.matched,
        clean = report.clean_records,
        groups = report.aggregate_groups,
        degraded = report.is_degraded(),
        "run complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::read_consolidated;
    use tempfile::{tempdir, TempDir};

    const LEDGER: &str = "\
DATA;REG_ANS;CD_CONTA_CONTABIL;DESCRICAO;VL_SALDO_INICIAL;VL_SALDO_FINAL
2024-01-01;123456;411;EVENTOS CONHECIDOS OU AVISADOS;0;1.234,56
2024-01-01;123456;311;CONTRAPRESTACOES EFETIVAS;0;999,00
2024-01-01;999;411;Sinistros a liquidar;0;100,00
2024-01-01;N/A;411;EVENTOS;0;N/A
";

    const REGISTRY: &str = "\
Registro_ANS;CNPJ;Razao_Social;Nome_Fantasia;Modalidade;UF
123456;11.222.333/0001-81;ACME SAUDE;ACME;Cooperativa Medica;SP
123456;33.000.167/0001-01;DUPLICADA;X;Medicina de Grupo;RJ
555;33000167000101;BETA;B;Autogestao;rj
";

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn fixture(with_registry: bool) -> Result<(TempDir, PipelineConfig)> {
        let dir = tempdir()?;
        let input = dir.path().join("downloads");
        fs::create_dir_all(input.join("2024"))?;
        fs::write(input.join("2024/1T2024.csv"), LEDGER)?;
        fs::write(input.join("2024/sem_descricao.csv"), "A;B\n1;2\n")?;

        let registry_path = dir.path().join("Relatorio_cadop.csv");
        if with_registry {
            fs::write(&registry_path, REGISTRY)?;
        }

        let cfg = PipelineConfig {
            input_dir: input,
            registry_path,
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        Ok((dir, cfg))
    }

    #[test]
    fn end_to_end_run() -> Result<()> {
        init_tracing();
        let (_dir, cfg) = fixture(true)?;
        let report = run(&cfg)?;

        assert_eq!(report.files_seen, 2);
        assert_eq!(report.files_read, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::NoDescriptionColumn { .. }
        ));
        assert_eq!(report.raw_rows, 5);
        assert_eq!(report.filtered_rows, 3);
        assert_eq!(report.registry_rows, 3);
        assert_eq!(report.duplicates_collapsed, 1);
        assert_eq!(report.enriched_records, 3);
        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.invalid_keys, 1);
        assert_eq!(report.clean_records, 1);
        assert_eq!(report.aggregate_groups, 1);
        assert!(!report.is_degraded());

        let out = &cfg.output_dir;
        for name in [
            output::CONSOLIDATED_CSV,
            output::CONSOLIDATED_ZIP,
            output::CONSOLIDATED_PARQUET,
            output::AGGREGATES_CSV,
            output::AGGREGATES_ZIP,
            output::REPORT_JSON,
        ] {
            assert!(out.join(name).is_file(), "{} missing", name);
        }

        let records = read_consolidated(&out.join(output::CONSOLIDATED_CSV))?;
        assert_eq!(records.len(), 3);
        let acme = &records[0];
        assert_eq!(acme.legal_name.as_deref(), Some("ACME SAUDE"));
        assert_eq!(acme.record.amount, 1234.56);
        assert_eq!(acme.record.year, 2024);
        assert_eq!(acme.record.quarter.label(), "1T");
        assert!(!records[1].matched);
        assert_eq!(records[2].record.amount, 0.0);

        let agg = fs::read_to_string(out.join(output::AGGREGATES_CSV))?;
        assert!(agg.contains("ACME SAUDE;SP;1234.56;1234.56;0.00;1"));
        Ok(())
    }

    #[test]
    fn missing_registry_degrades_but_still_writes() -> Result<()> {
        init_tracing();
        let (_dir, cfg) = fixture(false)?;
        let report = run(&cfg)?;

        assert!(matches!(report.degraded, Some(Degraded::RegistryMissing { .. })));
        assert_eq!(report.enriched_records, 3);
        assert_eq!(report.matched, 0);
        assert_eq!(report.clean_records, 0);

        let records = read_consolidated(&cfg.output_dir.join(output::CONSOLIDATED_CSV))?;
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.matched));

        let json = fs::read_to_string(cfg.output_dir.join(output::REPORT_JSON))?;
        assert!(json.contains("RegistryMissing"));
        Ok(())
    }

    #[test]
    fn registry_without_key_column_is_degraded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cadop.csv");
        fs::write(&path, "CNPJ;Razao_Social\n11222333000181;ACME\n")?;
        assert!(matches!(
            load_registry(&path, 4096),
            Err(Degraded::RegistryKeyColumnMissing { .. })
        ));
        Ok(())
    }

    #[test]
    fn registry_without_usable_header_is_unreadable() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cadop.csv");
        fs::write(&path, ";;;\n1;2;3;4\n")?;
        assert!(matches!(
            load_registry(&path, 4096),
            Err(Degraded::RegistryUnreadable { .. })
        ));
        Ok(())
    }

    #[test]
    fn exit_status_tracks_degradation() -> Result<()> {
        let mut report = PipelineReport::default();
        assert_eq!(report.exit_status(), 0);
        report.degraded = Some(Degraded::RegistryMissing { path: "x".into() });
        assert_eq!(report.exit_status(), EXIT_DEGRADED);

        let (_dir, cfg) = fixture(false)?;
        assert_eq!(run(&cfg)?.exit_status(), 2);
        Ok(())
    }

    #[test]
    fn header_only_registry_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cadop.csv");
        fs::write(&path, "Registro_ANS;CNPJ;Razao_Social;UF\n")?;
        assert!(matches!(
            load_registry(&path, 4096),
            Err(Degraded::RegistryEmpty { .. })
        ));
        Ok(())
    }

    #[test]
    fn empty_input_tree_is_not_an_error() -> Result<()> {
        let (dir, mut cfg) = fixture(true)?;
        cfg.input_dir = dir.path().join("nowhere");
        let report = run(&cfg)?;
        assert_eq!(report.files_seen, 0);
        assert_eq!(report.enriched_records, 0);
        assert!(cfg.output_dir.join(output::CONSOLIDATED_CSV).is_file());
        Ok(())
    }

    #[test]
    fn reruns_are_identical() -> Result<()> {
        let (_dir, cfg) = fixture(true)?;
        let first = run(&cfg)?;
        let csv_first = fs::read(cfg.output_dir.join(output::CONSOLIDATED_CSV))?;
        let second = run(&cfg)?;
        let csv_second = fs::read(cfg.output_dir.join(output::CONSOLIDATED_CSV))?;
        assert_eq!(first, second);
        assert_eq!(csv_first, csv_second);
        Ok(())
    }
}
