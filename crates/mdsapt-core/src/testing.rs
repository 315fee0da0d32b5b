//! Fakes and fixtures shared by the unit tests.

use crate::core::models::atom::Atom;
use crate::core::models::selection::ResiduePair;
use crate::core::models::structure::Structure;
use crate::engine::calculator::{SAPT_DISP, SAPT_ELST, SAPT_EXCH, SAPT_IND, SAPT_TOTAL};
use crate::engine::config::{SaptConfig, SaptConfigBuilder};
use crate::engine::geometry::GeometryBlock;
use crate::engine::solver::{QuantumSolver, SolverError, SolverVariables};
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SolverCall {
    pub method_basis: String,
    pub geometry: String,
    pub options: BTreeMap<String, String>,
    pub memory: Option<String>,
    pub threads: usize,
    pub output: Option<PathBuf>,
}

/// Records every call and returns small deterministic energies.
///
/// Calls listed in `failing_calls` (zero-based) fail with a convergence error
/// instead. A configured output file receives a one-line transcript.
#[derive(Debug, Default)]
pub struct FakeSolver {
    pub calls: Vec<SolverCall>,
    failing_calls: BTreeSet<usize>,
    options: BTreeMap<String, String>,
    memory: Option<String>,
    threads: usize,
    output: Option<PathBuf>,
}

impl FakeSolver {
    pub fn failing_at(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing_calls: calls.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl QuantumSolver for FakeSolver {
    fn set_options(&mut self, options: &BTreeMap<String, String>) {
        self.options = options.clone();
    }

    fn set_memory(&mut self, memory: &str) {
        self.memory = Some(memory.to_string());
    }

    fn set_threads(&mut self, threads: usize) {
        self.threads = threads;
    }

    fn set_output_file(&mut self, path: Option<&Path>) {
        self.output = path.map(Path::to_path_buf);
    }

    fn energy(
        &mut self,
        method_basis: &str,
        geometry: &str,
    ) -> Result<SolverVariables, SolverError> {
        let index = self.calls.len();
        self.calls.push(SolverCall {
            method_basis: method_basis.to_string(),
            geometry: geometry.to_string(),
            options: self.options.clone(),
            memory: self.memory.clone(),
            threads: self.threads,
            output: self.output.clone(),
        });

        if let Some(path) = &self.output {
            fs::write(path, format!("fake transcript {}\n", index))?;
        }
        if self.failing_calls.contains(&index) {
            return Err(SolverError::NotConverged(format!("call {}", index)));
        }

        let base = -0.001 * (index + 1) as f64;
        Ok([
            (SAPT_TOTAL, base),
            (SAPT_ELST, 2.0 * base),
            (SAPT_EXCH, -base),
            (SAPT_IND, 0.5 * base),
            (SAPT_DISP, 0.5 * base),
        ]
        .into_iter()
        .collect())
    }
}

pub fn sapt_config(pairs: Vec<(isize, isize)>) -> SaptConfig {
    SaptConfigBuilder::new()
        .method("sapt0")
        .basis("jun-cc-pvdz")
        .memory("1GB")
        .ncpus(2)
        .pairs(pairs.into_iter().map(ResiduePair::from).collect())
        .build()
        .unwrap()
}

pub fn geometry_for(key: isize, text: &str) -> GeometryBlock {
    GeometryBlock::from_text(key, text)
}

/// One water-like residue (O plus two H) per key, spaced along x, followed by
/// a solvent molecule that selections must skip.
pub fn residue_structure(keys: &[isize], shift: f64) -> Structure {
    let mut atoms = Vec::new();
    for (i, &key) in keys.iter().enumerate() {
        let x = 4.0 * i as f64 + shift;
        atoms.push(Atom::new("O", key, Point3::new(x, 0.0, 0.0)));
        atoms.push(Atom::new("HA", key, Point3::new(x + 0.96, 0.0, 0.0)));
        atoms.push(Atom::new("HB", key, Point3::new(x - 0.24, 0.93, 0.0)));
    }
    for name in ["OH2", "H1", "H2"] {
        atoms.push(Atom::new(name, 9000, Point3::new(-10.0, 0.0, 0.0)));
    }
    for (serial, atom) in atoms.iter_mut().enumerate() {
        atom.serial = serial + 1;
    }
    Structure::from_atoms(atoms)
}
