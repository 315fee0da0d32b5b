use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePsi4Config {
    pub method: Option<String>,
    pub basis: Option<String>,
    pub save_output: Option<bool>,
    pub executable: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub settings: Option<BTreeMap<String, toml::Value>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSystemLimits {
    pub ncpus: Option<usize>,
    pub memory: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTrajectoryConfig {
    pub topology: Option<PathBuf>,
    pub trajectories: Option<Vec<PathBuf>>,
    pub timestep: Option<f64>,
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDockingConfig {
    pub mode: Option<String>,
    pub combined_topologies: Option<PathBuf>,
    pub protein: Option<PathBuf>,
    pub ligands: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum FileAnalysisConfig {
    Trajectory(FileTrajectoryConfig),
    Docking(FileDockingConfig),
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub pairs: Option<Vec<(isize, isize)>>,
    pub on_failure: Option<String>,
    pub output: Option<PathBuf>,
    pub psi4: Option<FilePsi4Config>,
    pub system_limits: Option<FileSystemLimits>,
    pub analysis: Option<FileAnalysisConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Renders a TOML option value the way Psi4 expects it in a `set` block.
pub fn setting_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
