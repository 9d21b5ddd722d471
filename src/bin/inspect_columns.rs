use anyhow::{Context, Result};
use claimsjoin::{config::PipelineConfig, ingest::read_table, schema::map_columns};
use std::{env, fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

/// Show how a delimited file would be read: detected format, header, and
/// which columns the role table binds.
///
/// usage: inspect_columns <FILE>...
fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = PipelineConfig::load()?;
    let paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: inspect_columns <FILE>...");
    }

    for path in paths {
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let name = path.display().to_string();
        println!("{}", name);

        let table = match read_table(&bytes, &name, cfg.sniff_sample_bytes) {
            Ok(t) => t,
            Err(reason) => {
                println!("  skipped: {}", reason);
                continue;
            }
        };
        if let Some(format) = table.format {
            println!("  format:  {}", format);
        }
        println!("  rows:    {} ({} malformed dropped)", table.len(), table.skipped_records);
        println!("  header:  {:?}", table.headers);

        let columns = map_columns(&table.headers);
        if columns.is_empty() {
            println!("  no column matched any role");
        }
        for (role, binding) in columns.iter() {
            println!("  {:<20} -> #{} {:?}", role.to_string(), binding.index, binding.column);
        }
    }
    Ok(())
}
