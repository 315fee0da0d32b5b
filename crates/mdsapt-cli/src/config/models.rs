use mdsapt::engine::config::{DockingConfig, SaptConfig, TrajectoryConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisConfig {
    Trajectory(TrajectoryConfig),
    Docking(DockingConfig),
}

impl AnalysisConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trajectory(_) => "trajectory",
            Self::Docking(_) => "docking",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sapt: SaptConfig,
    pub analysis: AnalysisConfig,
    pub psi4_executable: PathBuf,
    /// Destination of the CSV results table.
    pub output_path: PathBuf,
}
