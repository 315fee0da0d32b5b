use super::{
    IterationStrategy, IterationUnit, RunFailure, SaptRunner, SelectionMap,
    resolve_available_selections,
};
use crate::core::io::ensemble::{Ensemble, PoseSource};
use crate::engine::config::{ConfigError, DockingConfig, DockingStructureMode, SaptConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::repair::StructureRepair;
use crate::engine::solver::QuantumSolver;
use crate::engine::table::{IterationId, ResultTable, TableSchema};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, instrument};

/// Pairwise SAPT over an ensemble of poses.
///
/// Poses are independent structures, so selections are resolved again for
/// every pose. A configured residue missing from one pose fails only the
/// pairs that use it in that pose.
pub struct DockingSapt<P: PoseSource> {
    source: P,
    keys: Vec<String>,
    selection_keys: BTreeSet<isize>,
    cursor: usize,
}

impl DockingSapt<Ensemble> {
    /// Opens the on-disk ensemble described by `docking`.
    ///
    /// The structure mode is checked before any file is read.
    pub fn from_config(config: &SaptConfig, docking: &DockingConfig) -> Result<Self, EngineError> {
        let mode = docking.resolved_mode()?;
        let ensemble = match mode {
            DockingStructureMode::Merged => {
                let dir = docking
                    .combined_topologies
                    .as_ref()
                    .ok_or(ConfigError::MissingParameter("combined-topologies"))?;
                Ensemble::merged(dir)
            }
            DockingStructureMode::Separate => {
                let protein = docking
                    .protein
                    .as_ref()
                    .ok_or(ConfigError::MissingParameter("protein"))?;
                let ligands = docking
                    .ligands
                    .as_ref()
                    .ok_or(ConfigError::MissingParameter("ligands"))?;
                Ensemble::separate(protein, ligands)
            }
        }
        .map_err(|e| ConfigError::InvalidValue {
            parameter: "docking",
            reason: e.to_string(),
        })?;

        info!(mode = ?mode, poses = ensemble.len(), "Docking ensemble opened.");
        Self::with_source(config, ensemble)
    }
}

impl<P: PoseSource> DockingSapt<P> {
    pub fn with_source(config: &SaptConfig, source: P) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = source
            .keys()
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();
        if keys.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "poses",
                reason: "the ensemble contains no poses".to_string(),
            }
            .into());
        }
        Ok(Self {
            source,
            keys,
            selection_keys: config.selection_keys(),
            cursor: 0,
        })
    }

    pub fn pose_keys(&self) -> &[String] {
        &self.keys
    }
}

impl<P: PoseSource> IterationStrategy for DockingSapt<P> {
    fn schema(&self) -> TableSchema {
        TableSchema::docking()
    }

    fn phase_name(&self) -> &'static str {
        "Docking SAPT"
    }

    fn total_units(&self) -> usize {
        self.keys.len()
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn next_unit(&mut self) -> Option<Result<IterationUnit, EngineError>> {
        let key = self.keys.get(self.cursor)?.clone();
        self.cursor += 1;

        let loaded = self.source.load(&key);
        let id = IterationId::Pose(key);
        Some(match loaded {
            Ok(structure) => Ok(IterationUnit { id, structure }),
            Err(e) => Err(EngineError::Structure {
                key: None,
                pair: None,
                iteration: id.describe(),
                reason: e.to_string(),
            }),
        })
    }

    fn selections(&self, unit: &IterationUnit) -> Cow<'_, SelectionMap> {
        Cow::Owned(resolve_available_selections(
            &unit.structure,
            &self.selection_keys,
        ))
    }
}

/// Opens the ensemble described by `docking` and runs every configured pair over each pose.
#[instrument(skip_all, name = "docking_workflow")]
pub fn run(
    config: &SaptConfig,
    docking: &DockingConfig,
    repair: &dyn StructureRepair,
    solver: &mut dyn QuantumSolver,
    reporter: &ProgressReporter,
) -> Result<ResultTable, RunFailure> {
    let mut strategy = DockingSapt::from_config(config, docking)
        .map_err(|e| RunFailure::before_start(e, TableSchema::docking()))?;
    SaptRunner::new(config, repair, reporter).run(&mut strategy, solver)
}
