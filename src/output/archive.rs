// src/output/archive.rs

use anyhow::{Context, Result};
use std::{fs, io::Write, path::Path};
use tracing::info;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Bundle `src` into a deflate archive at `dest`, stored under its file name.
pub fn zip_single_file(src: &Path, dest: &Path) -> Result<()> {
    let name = src
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no usable file name in {}", src.display()))?
        .to_string();
    let contents = fs::read(src).with_context(|| format!("reading {}", src.display()))?;

    super::write_atomically(dest, |out| {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("starting zip entry {}", name))?;
        zip.write_all(&contents)?;
        let cursor = zip.finish().context("finishing zip archive")?;
        out.write_all(cursor.get_ref())?;
        Ok(())
    })?;

    info!(src = %src.display(), dest = %dest.display(), bytes = contents.len(), "archived");
    Ok(())
}
