//! Pipeline configuration.
//!
//! Defaults reproduce the published analysis. An optional JSON file may
//! override any subset of fields:
//! ```json
//! {
//!   "year": 2013,
//!   "seed": 7,
//!   "rankings_file": "rankings_2013.csv"
//! }
//! ```

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fields::DEFAULT_YEAR;

/// Seed for the cross-validation shuffle.
pub const DEFAULT_SEED: u64 = 2001;

/// Number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// Environment variable holding the api.data.gov key.
pub const API_KEY_ENV: &str = "DATA_GOV_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outcome year; cohort fields are read ten years earlier.
    pub year: i32,
    pub seed: u64,
    pub folds: usize,
    /// File holding the api.data.gov key when the environment has none.
    pub api_key_file: PathBuf,
    pub raw_file: PathBuf,
    pub cleaned_file: PathBuf,
    pub rankings_file: PathBuf,
    pub means_file: PathBuf,
    pub summary_file: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            seed: DEFAULT_SEED,
            folds: DEFAULT_FOLDS,
            api_key_file: PathBuf::from("data_gov_api_key"),
            raw_file: PathBuf::from("college_raw.csv"),
            cleaned_file: PathBuf::from("college_cleaned.csv"),
            rankings_file: PathBuf::from("college_rankings.csv"),
            means_file: PathBuf::from("college_means.csv"),
            summary_file: PathBuf::from("summary.json"),
        }
    }
}

impl PipelineConfig {
    /// Loads a config from a JSON file; missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.folds >= 2, "folds must be at least 2, got {}", self.folds);
        Ok(())
    }

    /// Resolves a configured file name against the data directory.
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, data_dir: &Path, file: &Path) -> PathBuf {
        data_dir.join(file)
    }

    /// Reads the API key from the environment, falling back to the key file.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        let key = std::fs::read_to_string(&self.api_key_file).with_context(|| {
            format!(
                "{API_KEY_ENV} is not set and key file {} is unreadable",
                self.api_key_file.display()
            )
        })?;
        let key = key.trim();
        ensure!(
            !key.is_empty(),
            "key file {} is empty",
            self.api_key_file.display()
        );
        Ok(key.to_string())
    }
}
