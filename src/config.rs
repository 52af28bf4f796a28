use crate::error::{ReportError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout read from `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    pub data: PathBuf,
    pub results: PathBuf,
    pub figures: PathBuf,
    pub pivot_tables: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub paths: Paths,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Settings::from_json(&text).map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> std::result::Result<Settings, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Fact table produced by the scenario runs.
    pub fn fact_table(&self) -> PathBuf {
        self.paths.results.join("all_data.csv")
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.paths.figures.join("automated_plots")
    }

    pub fn run_summary(&self) -> PathBuf {
        self.paths.results.join("run_summary.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_paths_section() {
        let s = Settings::from_json(
            r#"{"paths": {"data": "data", "results": "results", "figures": "figures", "pivot_tables": "results/pivots"}}"#,
        )
        .unwrap();
        assert_eq!(s.fact_table(), PathBuf::from("results/all_data.csv"));
        assert_eq!(s.figures_dir(), PathBuf::from("figures/automated_plots"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }
}
