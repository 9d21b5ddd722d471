// src/output/mod.rs

pub mod archive;
pub mod columnar;
pub mod delimited;

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

pub use archive::zip_single_file;
pub use columnar::write_consolidated_parquet;
pub use delimited::{read_consolidated, write_aggregates, write_consolidated};

pub const CONSOLIDATED_CSV: &str = "consolidado_despesas.csv";
pub const CONSOLIDATED_ZIP: &str = "consolidado_despesas.zip";
pub const CONSOLIDATED_PARQUET: &str = "consolidado_despesas.parquet";
pub const AGGREGATES_CSV: &str = "despesas_agregadas.csv";
pub const AGGREGATES_ZIP: &str = "despesas_agregadas.zip";
pub const REPORT_JSON: &str = "run_report.json";

/// Write through a `.tmp` sibling and rename, so a crashed run never leaves
/// a half-written artifact under the final name.
pub(crate) fn write_atomically<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));
    let file = File::create(&tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;

    let written = (|| -> Result<()> {
        let mut writer = BufWriter::new(file);
        body(&mut writer)?;
        writer
            .flush()
            .with_context(|| format!("flushing `{}`", tmp_path.display()))?;
        drop(writer);
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp_path.display(),
                path.display()
            )
        })
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

/// Pretty JSON dump of any serialisable value, used for the run report.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomically(path, |w| {
        serde_json::to_writer_pretty(&mut *w, value)
            .with_context(|| format!("serialising {}", path.display()))?;
        w.write_all(b"\n")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_leaves_no_tmp_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.json");
        write_json(&path, &serde_json::json!({ "files": 3 }))?;

        let text = fs::read_to_string(&path)?;
        assert!(text.contains("\"files\": 3"));
        let leftovers: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn failed_write_cleans_up_tmp_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("agg.csv");
        let result = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            anyhow::bail!("serialisation failed")
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
