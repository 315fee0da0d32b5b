use crate::core::io::trajectory::FrameWindow;
use crate::core::models::selection::ResiduePair;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
    #[error("Residue pair {0} compares a residue with itself")]
    SelfPair(ResiduePair),
    #[error("Residue {0} has no selectable atoms in the structure")]
    UnknownResidue(isize),
}

/// What the orchestrator does when a single pair evaluation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failed pair, keeping rows appended so far.
    #[default]
    Abort,
    /// Append a row of NaN energies for the failed pair, log the failure, and continue.
    RecordMissing,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "record-missing" | "skip" => Ok(Self::RecordMissing),
            other => Err(ConfigError::InvalidValue {
                parameter: "on-failure",
                reason: format!("expected 'abort' or 'record-missing', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::RecordMissing => f.write_str("record-missing"),
        }
    }
}

/// How docking poses are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockingStructureMode {
    /// One file per pose with protein and ligand already combined.
    Merged,
    /// One shared protein file and one file per ligand pose.
    Separate,
}

impl FromStr for DockingStructureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merged" | "protein-ligand" => Ok(Self::Merged),
            "separate" | "separate-ligand" => Ok(Self::Separate),
            other => Err(ConfigError::InvalidValue {
                parameter: "mode",
                reason: format!("expected 'merged' or 'separate', got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Psi4Config {
    pub method: String,
    pub basis: String,
    /// Passed verbatim to the solver's option table.
    pub settings: BTreeMap<String, String>,
    /// Keep the raw solver transcript of every pair evaluation.
    pub save_output: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemLimits {
    /// Memory ceiling per solver invocation, e.g. `"2GB"`.
    pub memory: String,
    pub ncpus: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaptConfig {
    pub psi4: Psi4Config,
    pub limits: SystemLimits,
    pub pairs: Vec<ResiduePair>,
    pub failure_policy: FailurePolicy,
    /// Directory receiving audit transcripts.
    pub output_dir: PathBuf,
}

impl SaptConfig {
    /// Every residue key that appears in a configured pair.
    pub fn selection_keys(&self) -> BTreeSet<isize> {
        self.pairs
            .iter()
            .flat_map(|p| [p.first, p.second])
            .collect()
    }

    pub fn method_basis(&self) -> String {
        format!("{}/{}", self.psi4.method, self.psi4.basis)
    }
}

/// Checks a memory string of the form `<number><unit>` (`500MB`, `2 GiB`).
pub fn validate_memory(memory: &str) -> Result<(), ConfigError> {
    let trimmed = memory.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim().to_ascii_uppercase();

    let number_ok = number.parse::<f64>().is_ok_and(|n| n > 0.0);
    let unit_ok = matches!(
        unit.as_str(),
        "B" | "KB" | "MB" | "GB" | "TB" | "KIB" | "MIB" | "GIB" | "TIB"
    );
    if number_ok && unit_ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            parameter: "memory",
            reason: format!("'{}' is not a size such as '2GB'", memory),
        })
    }
}

#[derive(Default)]
pub struct SaptConfigBuilder {
    method: Option<String>,
    basis: Option<String>,
    settings: BTreeMap<String, String>,
    save_output: bool,
    memory: Option<String>,
    ncpus: Option<usize>,
    pairs: Option<Vec<ResiduePair>>,
    failure_policy: FailurePolicy,
    output_dir: Option<PathBuf>,
}

impl SaptConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
    pub fn basis(mut self, basis: impl Into<String>) -> Self {
        self.basis = Some(basis.into());
        self
    }
    pub fn settings(mut self, settings: BTreeMap<String, String>) -> Self {
        self.settings = settings;
        self
    }
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
    pub fn save_output(mut self, save: bool) -> Self {
        self.save_output = save;
        self
    }
    pub fn memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }
    pub fn ncpus(mut self, ncpus: usize) -> Self {
        self.ncpus = Some(ncpus);
        self
    }
    pub fn pairs(mut self, pairs: Vec<ResiduePair>) -> Self {
        self.pairs = Some(pairs);
        self
    }
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<SaptConfig, ConfigError> {
        let method = self
            .method
            .ok_or(ConfigError::MissingParameter("method"))?;
        let basis = self.basis.ok_or(ConfigError::MissingParameter("basis"))?;
        let memory = self
            .memory
            .ok_or(ConfigError::MissingParameter("memory"))?;
        let ncpus = self.ncpus.ok_or(ConfigError::MissingParameter("ncpus"))?;
        let pairs = self.pairs.ok_or(ConfigError::MissingParameter("pairs"))?;

        if method.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "method",
                reason: "must not be empty".to_string(),
            });
        }
        if basis.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "basis",
                reason: "must not be empty".to_string(),
            });
        }
        validate_memory(&memory)?;
        if ncpus == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "ncpus",
                reason: "at least one CPU is required".to_string(),
            });
        }
        if pairs.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "pairs",
                reason: "at least one residue pair is required".to_string(),
            });
        }
        if let Some(pair) = pairs.iter().find(|p| p.first == p.second) {
            return Err(ConfigError::SelfPair(*pair));
        }

        Ok(SaptConfig {
            psi4: Psi4Config {
                method,
                basis,
                settings: self.settings,
                save_output: self.save_output,
            },
            limits: SystemLimits { memory, ncpus },
            pairs,
            failure_policy: self.failure_policy,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryConfig {
    pub topology: PathBuf,
    /// Coordinate files read in order; empty means the topology's own models.
    pub trajectories: Vec<PathBuf>,
    /// Time between consecutive frames, in picoseconds.
    pub timestep: f64,
    pub window: FrameWindow,
}

impl TrajectoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timestep > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "timestep",
                reason: format!("must be positive, got {}", self.timestep),
            });
        }
        validate_window(&self.window)
    }
}

pub fn validate_window(window: &FrameWindow) -> Result<(), ConfigError> {
    if window.step == 0 {
        return Err(ConfigError::InvalidValue {
            parameter: "step",
            reason: "must be at least 1".to_string(),
        });
    }
    if let Some(stop) = window.stop {
        if stop <= window.start {
            return Err(ConfigError::InvalidValue {
                parameter: "stop",
                reason: format!("must be greater than start ({})", window.start),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DockingConfig {
    pub mode: Option<DockingStructureMode>,
    /// Directory of merged protein-ligand structures (`merged` mode).
    pub combined_topologies: Option<PathBuf>,
    /// Shared protein structure (`separate` mode).
    pub protein: Option<PathBuf>,
    /// Directory of ligand poses (`separate` mode).
    pub ligands: Option<PathBuf>,
}

impl DockingConfig {
    pub fn resolved_mode(&self) -> Result<DockingStructureMode, ConfigError> {
        self.mode.ok_or(ConfigError::MissingParameter("mode"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> SaptConfigBuilder {
        SaptConfigBuilder::new()
            .method("sapt0")
            .basis("jun-cc-pVDZ")
            .memory("2GB")
            .ncpus(4)
            .pairs(vec![ResiduePair::new(3, 7), ResiduePair::new(7, 11)])
    }

    #[test]
    fn build_succeeds_with_required_parameters() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.method_basis(), "sapt0/jun-cc-pVDZ");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(!config.psi4.save_output);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn selection_keys_are_union_of_pairs() {
        let config = complete_builder().build().unwrap();
        assert_eq!(
            config.selection_keys().into_iter().collect::<Vec<_>>(),
            vec![3, 7, 11]
        );
    }

    #[test]
    fn build_reports_first_missing_parameter() {
        let result = SaptConfigBuilder::new().basis("x").build();
        assert_eq!(result, Err(ConfigError::MissingParameter("method")));
    }

    #[test]
    fn build_rejects_empty_pairs() {
        let result = complete_builder().pairs(vec![]).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "pairs",
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_self_pair() {
        let result = complete_builder()
            .pairs(vec![ResiduePair::new(5, 5)])
            .build();
        assert_eq!(result, Err(ConfigError::SelfPair(ResiduePair::new(5, 5))));
    }

    #[test]
    fn build_rejects_zero_cpus() {
        let result = complete_builder().ncpus(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "ncpus",
                ..
            })
        ));
    }

    #[test]
    fn memory_validation_accepts_common_units() {
        for ok in ["2GB", "500 MB", "1.5gib", "64kb"] {
            assert!(validate_memory(ok).is_ok(), "{} should be valid", ok);
        }
        for bad in ["", "GB", "2", "2 parsecs", "-1GB", "0GB"] {
            assert!(validate_memory(bad).is_err(), "{} should be invalid", bad);
        }
    }

    #[test]
    fn docking_mode_parses_names_and_aliases() {
        assert_eq!(
            "merged".parse::<DockingStructureMode>().unwrap(),
            DockingStructureMode::Merged
        );
        assert_eq!(
            "Separate-Ligand".parse::<DockingStructureMode>().unwrap(),
            DockingStructureMode::Separate
        );
        assert!(matches!(
            "sideways".parse::<DockingStructureMode>(),
            Err(ConfigError::InvalidValue {
                parameter: "mode",
                ..
            })
        ));
    }

    #[test]
    fn unset_docking_mode_is_missing_parameter() {
        let config = DockingConfig::default();
        assert_eq!(
            config.resolved_mode(),
            Err(ConfigError::MissingParameter("mode"))
        );
    }

    #[test]
    fn failure_policy_parses_and_displays() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!(
            "record-missing".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::RecordMissing
        );
        assert_eq!(FailurePolicy::RecordMissing.to_string(), "record-missing");
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn trajectory_config_validates_timestep_and_window() {
        let mut config = TrajectoryConfig {
            topology: PathBuf::from("top.pdb"),
            trajectories: vec![],
            timestep: 1.0,
            window: FrameWindow::default(),
        };
        assert!(config.validate().is_ok());

        config.timestep = 0.0;
        assert!(config.validate().is_err());

        config.timestep = 1.0;
        config.window = FrameWindow {
            start: 5,
            stop: Some(5),
            step: 1,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                parameter: "stop",
                ..
            })
        ));
    }
}
