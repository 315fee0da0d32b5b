//! The boundary to the external quantum-chemistry program.
//!
//! Everything upstream of this module deals in geometry strings and
//! named scalar results; the concrete program lives behind [`QuantumSolver`].

mod psi4;

pub use psi4::Psi4Process;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver executable '{command}' was not found")]
    NotFound { command: String },
    #[error("Solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Calculation did not converge: {0}")]
    NotConverged(String),
    #[error("Solver did not produce variable '{0}'")]
    MissingVariable(String),
    #[error("Malformed solver output in '{}' line {line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("I/O error while running the solver: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render solver input: {0}")]
    Render(#[from] std::fmt::Error),
}

/// Named scalar results of one solver invocation, in Hartree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverVariables {
    values: HashMap<String, f64>,
}

impl SolverVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into().to_ascii_uppercase(), value);
    }

    /// Looks a variable up by name, ignoring case.
    pub fn variable(&self, name: &str) -> Result<f64, SolverError> {
        self.values
            .get(&name.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| SolverError::MissingVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SolverVariables {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

/// A quantum-chemistry program able to run one energy calculation.
///
/// Implementations hold option state between calls; the calculator sets it
/// before every invocation.
pub trait QuantumSolver {
    fn set_options(&mut self, options: &BTreeMap<String, String>);
    fn set_memory(&mut self, memory: &str);
    fn set_threads(&mut self, threads: usize);
    /// Where the raw transcript of the next call goes. `None` discards it.
    fn set_output_file(&mut self, path: Option<&Path>);

    /// Runs a single-point energy with `method_basis` (e.g. `sapt0/jun-cc-pvdz`)
    /// on `geometry` and returns every scalar variable it produced.
    fn energy(&mut self, method_basis: &str, geometry: &str)
    -> Result<SolverVariables, SolverError>;
}
