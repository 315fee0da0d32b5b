//! # Workflows Module
//!
//! High-level entry points that run pairwise SAPT over a set of structures.
//!
//! A workflow is an [`IterationStrategy`] (what to iterate and how to select
//! residues in each unit) driven by the shared [`SaptRunner`] (how each unit
//! is evaluated and recorded).
//!
//! - **Trajectory Workflow** ([`trajectory`]) - time-ordered frames of one topology
//! - **Docking Workflow** ([`docking`]) - independently generated protein-ligand poses

pub mod docking;
pub mod trajectory;

use crate::core::models::selection::{AtomSelection, ResiduePair};
use crate::core::models::structure::Structure;
use crate::engine::calculator::{EnergyResult, PairEnergyCalculator, audit_file_name};
use crate::engine::config::{ConfigError, FailurePolicy, SaptConfig};
use crate::engine::error::EngineError;
use crate::engine::geometry::{GeometryBlock, GeometryBuilder};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::repair::StructureRepair;
use crate::engine::solver::QuantumSolver;
use crate::engine::table::{IterationId, ResultAccumulator, ResultTable, TableSchema};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub type SelectionMap = BTreeMap<isize, AtomSelection>;

/// One frame or pose, ready to be evaluated.
#[derive(Debug, Clone)]
pub struct IterationUnit {
    pub id: IterationId,
    pub structure: Structure,
}

/// What a workflow iterates over.
pub trait IterationStrategy {
    fn schema(&self) -> TableSchema;

    /// Label reported to the progress observer when the run starts.
    fn phase_name(&self) -> &'static str;

    fn total_units(&self) -> usize;

    /// Restarts iteration from the first unit.
    fn rewind(&mut self);

    fn next_unit(&mut self) -> Option<Result<IterationUnit, EngineError>>;

    /// Selections valid for `unit`. Configured residues absent from the map
    /// fail as structure errors for every pair that uses them.
    fn selections(&self, unit: &IterationUnit) -> Cow<'_, SelectionMap>;
}

/// A run that stopped early. `partial` holds every row appended before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: EngineError,
    pub partial: ResultTable,
}

impl RunFailure {
    pub fn before_start(error: impl Into<EngineError>, schema: TableSchema) -> Self {
        Self {
            error: error.into(),
            partial: ResultAccumulator::new(schema).finish(),
        }
    }
}

/// Resolves every key against `structure`, failing on the first unknown residue.
pub fn resolve_selections(
    structure: &Structure,
    keys: &BTreeSet<isize>,
) -> Result<SelectionMap, ConfigError> {
    keys.iter()
        .map(|&key| {
            AtomSelection::resolve(structure, key)
                .map(|sel| (key, sel))
                .ok_or(ConfigError::UnknownResidue(key))
        })
        .collect()
}

/// Resolves the keys present in `structure` and skips the rest.
pub fn resolve_available_selections(structure: &Structure, keys: &BTreeSet<isize>) -> SelectionMap {
    keys.iter()
        .filter_map(|&key| AtomSelection::resolve(structure, key).map(|sel| (key, sel)))
        .collect()
}

type GeometrySet = BTreeMap<isize, Result<GeometryBlock, String>>;

/// Evaluates every configured pair on every unit of a strategy.
pub struct SaptRunner<'a> {
    config: &'a SaptConfig,
    calculator: PairEnergyCalculator,
    geometry: GeometryBuilder<'a>,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a> SaptRunner<'a> {
    pub fn new(
        config: &'a SaptConfig,
        repair: &'a dyn StructureRepair,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            config,
            calculator: PairEnergyCalculator::from_config(config),
            geometry: GeometryBuilder::new(repair),
            reporter,
        }
    }

    #[instrument(skip_all, name = "sapt_run")]
    pub fn run<S: IterationStrategy + ?Sized>(
        &self,
        strategy: &mut S,
        solver: &mut dyn QuantumSolver,
    ) -> Result<ResultTable, RunFailure> {
        let schema = strategy.schema();
        if self.config.psi4.save_output {
            fs::create_dir_all(&self.config.output_dir).map_err(|e| {
                RunFailure::before_start(
                    ConfigError::InvalidValue {
                        parameter: "output-dir",
                        reason: format!("{}: {}", self.config.output_dir.display(), e),
                    },
                    schema,
                )
            })?;
        }

        strategy.rewind();
        let mut acc = ResultAccumulator::new(schema);
        let total = (strategy.total_units() * self.config.pairs.len()) as u64;

        self.reporter.report(Progress::PhaseStart {
            name: strategy.phase_name(),
        });
        self.reporter.report(Progress::TaskStart { total_steps: total });
        info!(
            units = strategy.total_units(),
            pairs = self.config.pairs.len(),
            method = self.calculator.method_basis(),
            policy = %self.config.failure_policy,
            "Starting SAPT run."
        );

        while let Some(next) = strategy.next_unit() {
            let outcome = next.and_then(|unit| self.evaluate_unit(&*strategy, &unit, solver, &mut acc));
            if let Err(error) = outcome {
                self.reporter.report(Progress::TaskFinish);
                self.reporter.report(Progress::PhaseFinish);
                warn!(error = %error, rows = acc.len(), "SAPT run aborted.");
                return Err(RunFailure {
                    error,
                    partial: acc.finish(),
                });
            }
        }

        self.reporter.report(Progress::TaskFinish);
        self.reporter.report(Progress::PhaseFinish);
        let table = acc.finish();
        info!(
            rows = table.len(),
            failures = table.failures().len(),
            "SAPT run complete."
        );
        Ok(table)
    }

    fn evaluate_unit<S: IterationStrategy + ?Sized>(
        &self,
        strategy: &S,
        unit: &IterationUnit,
        solver: &mut dyn QuantumSolver,
        acc: &mut ResultAccumulator,
    ) -> Result<(), EngineError> {
        let iteration = unit.id.describe();
        debug!(iteration = %iteration, "Evaluating unit.");

        let selections = strategy.selections(unit);
        let geometries = self.build_geometries(&selections, &unit.structure);

        for pair in &self.config.pairs {
            let label = pair.label();
            self.reporter.report(Progress::PairStart {
                pair: label.clone(),
                iteration: iteration.clone(),
            });

            match self.evaluate_pair(pair, &unit.id, &geometries, solver) {
                Ok(energies) => acc.push(pair, &unit.id, energies),
                Err(error) => {
                    self.reporter.report(Progress::PairFailed {
                        pair: label,
                        iteration: iteration.clone(),
                        error: error.to_string(),
                    });
                    match self.config.failure_policy {
                        FailurePolicy::Abort => return Err(error),
                        FailurePolicy::RecordMissing => {
                            warn!(error = %error, "Recording missing energies.");
                            acc.push_missing(pair, &unit.id, &error);
                        }
                    }
                }
            }
            self.reporter.report(Progress::TaskIncrement);
        }
        Ok(())
    }

    /// Geometry for every configured residue, built once per unit.
    fn build_geometries(&self, selections: &SelectionMap, structure: &Structure) -> GeometrySet {
        self.config
            .selection_keys()
            .into_iter()
            .map(|key| {
                let block = match selections.get(&key) {
                    Some(selection) => self
                        .geometry
                        .build(selection, structure)
                        .map_err(|e| e.source.to_string()),
                    None => Err("residue has no selectable atoms".to_string()),
                };
                (key, block)
            })
            .collect()
    }

    fn evaluate_pair(
        &self,
        pair: &ResiduePair,
        id: &IterationId,
        geometries: &GeometrySet,
        solver: &mut dyn QuantumSolver,
    ) -> Result<EnergyResult, EngineError> {
        let lookup = |key: isize| match geometries.get(&key) {
            Some(Ok(block)) => Ok(block),
            Some(Err(reason)) => Err(EngineError::Structure {
                key: Some(key),
                pair: Some(pair.label()),
                iteration: id.describe(),
                reason: reason.clone(),
            }),
            None => Err(EngineError::Structure {
                key: Some(key),
                pair: Some(pair.label()),
                iteration: id.describe(),
                reason: "residue was not prepared".to_string(),
            }),
        };
        let first = lookup(pair.first)?;
        let second = lookup(pair.second)?;

        let output = self
            .config
            .psi4
            .save_output
            .then(|| self.config.output_dir.join(audit_file_name(pair, &id.to_string())));

        self.calculator
            .compute(solver, first, second, output.as_deref())
            .map_err(|source| EngineError::Solver {
                pair: pair.label(),
                iteration: id.describe(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;
    use crate::engine::repair::ElectronCountRepair;
    use crate::testing::{FakeSolver, residue_structure, sapt_config};
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use std::sync::Mutex;

    /// Yields fixed structures keyed as poses, resolving only what each holds.
    struct Fixed {
        units: Vec<IterationUnit>,
        cursor: usize,
        keys: BTreeSet<isize>,
    }

    impl Fixed {
        fn new(structures: Vec<(&str, Structure)>, keys: BTreeSet<isize>) -> Self {
            Self {
                units: structures
                    .into_iter()
                    .map(|(k, s)| IterationUnit {
                        id: IterationId::Pose(k.to_string()),
                        structure: s,
                    })
                    .collect(),
                cursor: 0,
                keys,
            }
        }
    }

    impl IterationStrategy for Fixed {
        fn schema(&self) -> TableSchema {
            TableSchema::docking()
        }
        fn phase_name(&self) -> &'static str {
            "Fixed"
        }
        fn total_units(&self) -> usize {
            self.units.len()
        }
        fn rewind(&mut self) {
            self.cursor = 0;
        }
        fn next_unit(&mut self) -> Option<Result<IterationUnit, EngineError>> {
            let unit = self.units.get(self.cursor).cloned()?;
            self.cursor += 1;
            Some(Ok(unit))
        }
        fn selections(&self, unit: &IterationUnit) -> Cow<'_, SelectionMap> {
            Cow::Owned(resolve_available_selections(&unit.structure, &self.keys))
        }
    }

    #[test]
    fn geometry_is_built_once_per_residue_per_unit() {
        let config = sapt_config(vec![(1, 2), (1, 3), (2, 3)]);
        let reporter = ProgressReporter::new();
        let runner = SaptRunner::new(&config, &ElectronCountRepair, &reporter);
        let mut strategy = Fixed::new(
            vec![("a", residue_structure(&[1, 2, 3], 0.0))],
            config.selection_keys(),
        );
        let mut solver = FakeSolver::default();

        let table = runner.run(&mut strategy, &mut solver).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(solver.calls.len(), 3);
        assert!(solver.calls[0].geometry.starts_with("0 1\nO 0 0 0"));
    }

    #[test]
    fn missing_residue_in_unit_is_a_structure_error() {
        let mut config = sapt_config(vec![(1, 2)]);
        config.failure_policy = FailurePolicy::RecordMissing;
        let reporter = ProgressReporter::new();
        let runner = SaptRunner::new(&config, &ElectronCountRepair, &reporter);
        let mut strategy = Fixed::new(
            vec![
                ("a", residue_structure(&[1], 0.0)),
                ("b", residue_structure(&[1, 2], 0.0)),
            ],
            config.selection_keys(),
        );
        let mut solver = FakeSolver::default();

        let table = runner.run(&mut strategy, &mut solver).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows()[0].energies.is_missing());
        assert!(!table.rows()[1].energies.is_missing());
        assert_eq!(table.failures()[0].kind, ErrorKind::Structure);
        assert_eq!(solver.calls.len(), 1);
    }

    #[test]
    fn aborting_structure_error_names_the_pair() {
        let config = sapt_config(vec![(1, 2)]);
        let reporter = ProgressReporter::new();
        let runner = SaptRunner::new(&config, &ElectronCountRepair, &reporter);
        let structure = Structure::from_atoms(vec![
            Atom::new("O", 1, Point3::new(0.0, 0.0, 0.0)),
            Atom::new("XX", 2, Point3::new(4.0, 0.0, 0.0)).with_element(None),
        ]);
        let mut strategy = Fixed::new(vec![("a", structure)], config.selection_keys());

        let failure = runner
            .run(&mut strategy, &mut FakeSolver::default())
            .unwrap_err();
        assert_eq!(failure.error.kind(), ErrorKind::Structure);
        let message = failure.error.to_string();
        assert!(message.contains("pair 1-2"), "{}", message);
        assert!(message.contains("residue 2"), "{}", message);
        assert!(failure.partial.is_empty());
    }

    #[test]
    fn progress_events_bracket_the_run() {
        let config = sapt_config(vec![(1, 2)]);
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        {
            let runner = SaptRunner::new(&config, &ElectronCountRepair, &reporter);
            let mut strategy = Fixed::new(
                vec![
                    ("a", residue_structure(&[1, 2], 0.0)),
                    ("b", residue_structure(&[1, 2], 1.0)),
                ],
                config.selection_keys(),
            );
            runner.run(&mut strategy, &mut FakeSolver::default()).unwrap();
        }
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert!(matches!(events[0], Progress::PhaseStart { name: "Fixed" }));
        assert!(matches!(events[1], Progress::TaskStart { total_steps: 2 }));
        let increments = events
            .iter()
            .filter(|e| matches!(e, Progress::TaskIncrement))
            .count();
        assert_eq!(increments, 2);
        assert!(matches!(events.last(), Some(Progress::PhaseFinish)));
    }

    #[test]
    fn rerunning_a_strategy_starts_a_fresh_table() {
        let config = sapt_config(vec![(1, 2)]);
        let reporter = ProgressReporter::new();
        let runner = SaptRunner::new(&config, &ElectronCountRepair, &reporter);
        let mut strategy = Fixed::new(
            vec![("a", residue_structure(&[1, 2], 0.0))],
            config.selection_keys(),
        );
        let mut solver = FakeSolver::default();

        let first = runner.run(&mut strategy, &mut solver).unwrap();
        let second = runner.run(&mut strategy, &mut solver).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn resolve_selections_rejects_unknown_residue() {
        let structure = residue_structure(&[1, 2], 0.0);
        let keys = BTreeSet::from([1, 2, 9000]);
        assert_eq!(
            resolve_selections(&structure, &keys),
            Err(ConfigError::UnknownResidue(9000))
        );
    }
}
