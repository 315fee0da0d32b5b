use thiserror::Error;

use super::config::ConfigError;
use super::solver::SolverError;

/// The three kinds of failure a SAPT run can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Structure,
    Solver,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid run setup. Raised before any computation.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A structure could not be read, or a selection could not be turned into
    /// a charged, spin-balanced geometry.
    #[error(
        "Structure error{} at {iteration}{}: {reason}",
        pair_suffix(.pair),
        residue_suffix(.key)
    )]
    Structure {
        key: Option<isize>,
        /// Label of the pair being evaluated, when the failure belongs to one.
        pair: Option<String>,
        iteration: String,
        reason: String,
    },

    /// The quantum-chemistry solver failed for one pair.
    #[error("SAPT calculation failed for pair {pair} at {iteration}: {source}")]
    Solver {
        pair: String,
        iteration: String,
        #[source]
        source: SolverError,
    },
}

fn pair_suffix(pair: &Option<String>) -> String {
    pair.as_ref()
        .map(|p| format!(" for pair {}", p))
        .unwrap_or_default()
}

fn residue_suffix(key: &Option<isize>) -> String {
    key.map(|k| format!(" (residue {})", k)).unwrap_or_default()
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Structure { .. } => ErrorKind::Structure,
            Self::Solver { .. } => ErrorKind::Solver,
        }
    }
}
