use super::config::SaptConfig;
use super::geometry::GeometryBlock;
use super::solver::{QuantumSolver, SolverError, SolverVariables};
use crate::core::models::selection::ResiduePair;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

pub const HARTREE_TO_KCAL_MOL: f64 = 627.509;

pub const SAPT_TOTAL: &str = "SAPT TOTAL ENERGY";
pub const SAPT_ELST: &str = "SAPT ELST ENERGY";
pub const SAPT_EXCH: &str = "SAPT EXCH ENERGY";
pub const SAPT_IND: &str = "SAPT IND ENERGY";
pub const SAPT_DISP: &str = "SAPT DISP ENERGY";

/// The five SAPT components of one pair evaluation, in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyResult {
    pub total: f64,
    pub electrostatic: f64,
    pub exchange: f64,
    pub induction: f64,
    pub dispersion: f64,
}

impl EnergyResult {
    /// Reads the five components from solver output and converts them.
    ///
    /// `total` is the solver's own total; it is not re-summed from the parts.
    pub fn from_hartree(vars: &SolverVariables) -> Result<Self, SolverError> {
        let kcal = |name| vars.variable(name).map(|e| e * HARTREE_TO_KCAL_MOL);
        Ok(Self {
            total: kcal(SAPT_TOTAL)?,
            electrostatic: kcal(SAPT_ELST)?,
            exchange: kcal(SAPT_EXCH)?,
            induction: kcal(SAPT_IND)?,
            dispersion: kcal(SAPT_DISP)?,
        })
    }

    /// Placeholder for a pair whose evaluation failed.
    pub fn missing() -> Self {
        Self {
            total: f64::NAN,
            electrostatic: f64::NAN,
            exchange: f64::NAN,
            induction: f64::NAN,
            dispersion: f64::NAN,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.total.is_nan()
    }
}

pub fn dimer_geometry(first: &GeometryBlock, second: &GeometryBlock) -> String {
    format!("{}\n--\n{}\nunits angstrom", first.as_str(), second.as_str())
}

/// File name of the raw solver transcript for one pair at one iteration.
pub fn audit_file_name(pair: &ResiduePair, iteration: &str) -> String {
    format!("sapt_{}_{}.out", pair.label(), iteration)
}

pub struct PairEnergyCalculator {
    method_basis: String,
    settings: BTreeMap<String, String>,
    memory: String,
    threads: usize,
}

impl PairEnergyCalculator {
    pub fn from_config(config: &SaptConfig) -> Self {
        Self {
            method_basis: config.method_basis(),
            settings: config.psi4.settings.clone(),
            memory: config.limits.memory.clone(),
            threads: config.limits.ncpus,
        }
    }

    pub fn method_basis(&self) -> &str {
        &self.method_basis
    }

    pub fn compute(
        &self,
        solver: &mut dyn QuantumSolver,
        first: &GeometryBlock,
        second: &GeometryBlock,
        output: Option<&Path>,
    ) -> Result<EnergyResult, SolverError> {
        let dimer = dimer_geometry(first, second);
        trace!(dimer = %dimer, "Dimer geometry");

        solver.set_options(&self.settings);
        solver.set_memory(&self.memory);
        solver.set_threads(self.threads);
        solver.set_output_file(output);

        let vars = solver.energy(&self.method_basis, &dimer)?;
        EnergyResult::from_hartree(&vars)
    }
}
