// src/ingest/mod.rs
pub mod raw_table;
pub mod sniff;

pub use raw_table::RawTable;
pub use sniff::{read_table, sniff_format, Format, TextEncoding};

use anyhow::{Context, Result};
use glob::glob;
use rayon::prelude::*;
use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::error::SkipReason;

/// Extensions treated as delimited text, compared case-insensitively.
const TEXT_EXTENSIONS: &[&str] = &["csv", "txt"];

/// One source file (or archive entry) and what came of reading it.
#[derive(Debug)]
pub struct LoadedSource {
    pub name: String,
    pub outcome: Result<RawTable, SkipReason>,
}

fn extension_lower(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_text_source(name: &str) -> bool {
    extension_lower(name).is_some_and(|e| TEXT_EXTENSIONS.contains(&e.as_str()))
}

fn is_zip(name: &str) -> bool {
    extension_lower(name).as_deref() == Some("zip")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Every text source or zip archive under `dir`, sorted so that every run
/// sees the same order regardless of directory iteration.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "input directory missing; nothing to ingest");
        return Ok(Vec::new());
    }
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid glob pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.to_string_lossy();
            is_text_source(&name) || is_zip(&name)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Read every `.csv`/`.txt` entry of a zip archive into memory, in archive order.
fn read_zip_entries(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(path).with_context(|| format!("opening zip {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading zip archive {}", path.display()))?;

    let mut buffers = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("accessing entry #{} of {}", i, path.display()))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !is_text_source(&name) {
            continue;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("reading {} from {}", name, path.display()))?;
        buffers.push((name, buf));
    }
    Ok(buffers)
}

/// Load one path: a text file yields one source, an archive one per entry.
/// Failures become [`SkipReason`]s on the returned sources.
pub fn load_path(path: &Path, sample_bytes: usize) -> Vec<LoadedSource> {
    let name = display_name(path);

    if is_zip(&name) {
        return match read_zip_entries(path) {
            Ok(entries) => entries
                .into_iter()
                .map(|(entry, bytes)| {
                    let source = format!("{}/{}", name, entry);
                    let outcome = read_table(&bytes, &source, sample_bytes);
                    LoadedSource { name: source, outcome }
                })
                .collect(),
            Err(e) => {
                warn!(source = %name, error = %e, "skipping unreadable archive");
                vec![LoadedSource {
                    name,
                    outcome: Err(SkipReason::Io(format!("{:#}", e))),
                }]
            }
        };
    }

    let outcome = match fs::read(path) {
        Ok(bytes) => read_table(&bytes, &name, sample_bytes),
        Err(e) => Err(SkipReason::Io(e.to_string())),
    };
    vec![LoadedSource { name, outcome }]
}

/// Discover and parse the whole tree. Files are parsed in parallel but the
/// result keeps the sorted discovery order.
#[instrument(level = "info", skip(dir), fields(dir = %dir.display()))]
pub fn load_tree(dir: &Path, sample_bytes: usize) -> Result<Vec<LoadedSource>> {
    let paths = discover(dir)?;
    info!(files = paths.len(), "discovered source files");

    let loaded: Vec<LoadedSource> = paths
        .par_iter()
        .map(|p| load_path(p, sample_bytes))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    for src in &loaded {
        match &src.outcome {
            Ok(t) => debug!(source = %src.name, rows = t.len(), "parsed"),
            Err(reason) => warn!(source = %src.name, %reason, "skipped"),
        }
    }
    Ok(loaded)
}
