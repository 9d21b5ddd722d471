// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::model::Quarter;

pub const CONFIG_ENV: &str = "CLAIMSJOIN_CONFIG";
pub const INPUT_DIR_ENV: &str = "CLAIMSJOIN_INPUT_DIR";
pub const REGISTRY_ENV: &str = "CLAIMSJOIN_REGISTRY";
pub const OUTPUT_DIR_ENV: &str = "CLAIMSJOIN_OUTPUT_DIR";

/// Everything a pipeline run needs to know. Every field has a default, so an
/// empty YAML document (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the already-downloaded financial statement tree.
    pub input_dir: PathBuf,
    /// The regulator's registry of active organizations.
    pub registry_path: PathBuf,
    pub output_dir: PathBuf,
    /// Description tokens that mark a ledger row as claims expenditure.
    pub expense_keywords: Vec<String>,
    /// Used when neither the file name nor the row carries a year.
    pub fallback_year: i32,
    pub fallback_quarter: Quarter,
    /// Upper bound on the bytes the format sniffer decodes per attempt.
    pub sniff_sample_bytes: usize,
    pub write_parquet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("downloads_ans"),
            registry_path: PathBuf::from("Relatorio_cadop.csv"),
            output_dir: PathBuf::from("."),
            expense_keywords: vec!["EVENTO".into(), "SINISTRO".into()],
            fallback_year: 2025,
            fallback_quarter: Quarter::Q3,
            sniff_sample_bytes: 64 * 1024,
            write_parquet: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("parsing pipeline config YAML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Load from `$CLAIMSJOIN_CONFIG` when set, then apply the directory
    /// overrides from the environment.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!(path = %path.display(), "loading config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(|key| env::var_os(key).map(PathBuf::from));
        Ok(cfg)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        if let Some(p) = lookup(INPUT_DIR_ENV) {
            self.input_dir = p;
        }
        if let Some(p) = lookup(REGISTRY_ENV) {
            self.registry_path = p;
        }
        if let Some(p) = lookup(OUTPUT_DIR_ENV) {
            self.output_dir = p;
        }
    }
}
