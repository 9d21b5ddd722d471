use anyhow::Result;
use claimsjoin::{config::PipelineConfig, output, pipeline::write_aggregate_outputs};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Re-run validation and aggregation over an existing consolidated file.
///
/// usage: aggregate [CONSOLIDATED_CSV] [OUTPUT_DIR]
/// Both default to the configured output directory.
fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = PipelineConfig::load()?;
    let mut args = env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.output_dir.join(output::CONSOLIDATED_CSV));
    let output_dir = args.next().map(PathBuf::from).unwrap_or(cfg.output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let records = output::read_consolidated(&input)?;
    let (clean, rows) = write_aggregate_outputs(&records, &output_dir)?;

    info!(
        input = %input.display(),
        records = records.len(),
        clean,
        rejected = records.len() - clean,
        groups = rows.len(),
        "aggregation written"
    );
    for row in rows.iter().take(10) {
        println!(
            "{:<50} {:>4} {:>18.2} {:>6}",
            row.legal_name, row.region, row.total, row.count
        );
    }
    Ok(())
}
