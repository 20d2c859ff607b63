//! Per-run configuration: which model, year, scenario, and folders.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gct_core::{GctError, GctResult};

pub const DEFAULT_TS_FNAME: &str = "${component_type}_${name}_${year}.csv";

/// One translation run. Loaded from JSON; missing mandatory keys are a
/// configuration error before anything is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub study_year: i32,
    /// Year the hourly profiles are drawn from; defaults to the study year.
    #[serde(default)]
    pub weather_year: Option<i32>,
    /// Scenario selecting the model in a multi-model source.
    #[serde(default)]
    pub scenario: Option<String>,
    /// Scenarios whose property rows override the base case, in
    /// precedence order (first wins on conflict).
    #[serde(default)]
    pub active_scenarios: Vec<String>,
    pub run_folder: PathBuf,
    pub output_folder: PathBuf,
    /// Filename template for exported time-series data files.
    #[serde(default = "default_ts_fname")]
    pub time_series_fname: String,
}

fn default_ts_fname() -> String {
    DEFAULT_TS_FNAME.to_string()
}

impl RunConfig {
    pub fn from_file(path: &Path) -> GctResult<Self> {
        let file = File::open(path)?;
        let config: RunConfig = serde_json::from_reader(file)
            .map_err(|e| GctError::Config(format!("invalid run config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GctResult<()> {
        if self.name.is_empty() {
            return Err(GctError::Config("run name is empty".to_string()));
        }
        if !(1900..=2200).contains(&self.study_year) {
            return Err(GctError::Config(format!(
                "study year {} outside plausible range",
                self.study_year
            )));
        }
        Ok(())
    }

    pub fn weather_year(&self) -> i32 {
        self.weather_year.unwrap_or(self.study_year)
    }

    /// Expand the data-file template for one component.
    pub fn time_series_filename(&self, component_type: &str, name: &str) -> String {
        self.time_series_fname
            .replace("${component_type}", component_type)
            .replace("${name}", name)
            .replace("${year}", &self.study_year.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_minimal() {
        let f = write_config(
            r#"{"name": "run1", "study_year": 2030,
                "run_folder": "/in", "output_folder": "/out"}"#,
        );
        let cfg = RunConfig::from_file(f.path()).unwrap();
        assert_eq!(cfg.weather_year(), 2030);
        assert!(cfg.active_scenarios.is_empty());
        assert_eq!(cfg.time_series_fname, DEFAULT_TS_FNAME);
    }

    #[test]
    fn test_missing_mandatory_key_is_config_error() {
        let f = write_config(r#"{"name": "run1"}"#);
        let err = RunConfig::from_file(f.path()).unwrap_err();
        assert!(matches!(err, GctError::Config(_)));
    }

    #[test]
    fn test_filename_template() {
        let f = write_config(
            r#"{"name": "run1", "study_year": 2035,
                "run_folder": "/in", "output_folder": "/out"}"#,
        );
        let cfg = RunConfig::from_file(f.path()).unwrap();
        assert_eq!(
            cfg.time_series_filename("Generator", "gas-1"),
            "Generator_gas-1_2035.csv"
        );
    }
}
