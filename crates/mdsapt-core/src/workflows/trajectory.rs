use super::{
    IterationStrategy, IterationUnit, RunFailure, SaptRunner, SelectionMap, resolve_selections,
};
use crate::core::io::trajectory::{FrameWindow, PdbTrajectory, Trajectory};
use crate::engine::config::{ConfigError, SaptConfig, TrajectoryConfig, validate_window};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::repair::StructureRepair;
use crate::engine::solver::QuantumSolver;
use crate::engine::table::{IterationId, ResultTable, TableSchema};
use std::borrow::Cow;
use tracing::{info, instrument};

/// Pairwise SAPT over the frames of one trajectory.
///
/// Selections are resolved once against the topology; each frame supplies
/// new coordinates for the same atoms. Frames are visited in increasing
/// time order and every pair of a frame is evaluated before the next frame.
pub struct TrajectorySapt<T: Trajectory> {
    trajectory: T,
    selections: SelectionMap,
    frames: Vec<usize>,
    cursor: usize,
    last_time: Option<f64>,
}

impl<T: Trajectory> TrajectorySapt<T> {
    pub fn new(config: &SaptConfig, trajectory: T, window: FrameWindow) -> Result<Self, EngineError> {
        validate_window(&window)?;
        let selections = resolve_selections(trajectory.topology(), &config.selection_keys())?;

        let frames = window.indices(trajectory.len());
        if frames.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "frames",
                reason: format!(
                    "window selects no frames of a {}-frame trajectory",
                    trajectory.len()
                ),
            }
            .into());
        }

        Ok(Self {
            trajectory,
            selections,
            frames,
            cursor: 0,
            last_time: None,
        })
    }

    /// Indices of the frames this run visits.
    pub fn frames(&self) -> &[usize] {
        &self.frames
    }
}

impl<T: Trajectory> IterationStrategy for TrajectorySapt<T> {
    fn schema(&self) -> TableSchema {
        TableSchema::trajectory()
    }

    fn phase_name(&self) -> &'static str {
        "Trajectory SAPT"
    }

    fn total_units(&self) -> usize {
        self.frames.len()
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.last_time = None;
    }

    fn next_unit(&mut self) -> Option<Result<IterationUnit, EngineError>> {
        let index = *self.frames.get(self.cursor)?;
        self.cursor += 1;

        let frame = match self.trajectory.read_frame(index) {
            Ok(frame) => frame,
            Err(e) => {
                return Some(Err(EngineError::Structure {
                    key: None,
                    pair: None,
                    iteration: format!("frame {}", index),
                    reason: e.to_string(),
                }));
            }
        };

        if self.last_time.is_some_and(|last| frame.time <= last) {
            return Some(Err(EngineError::Structure {
                key: None,
                pair: None,
                iteration: IterationId::Time(frame.time).describe(),
                reason: "frame times must increase strictly".to_string(),
            }));
        }
        self.last_time = Some(frame.time);

        Some(Ok(IterationUnit {
            id: IterationId::Time(frame.time),
            structure: frame.structure,
        }))
    }

    fn selections(&self, _unit: &IterationUnit) -> Cow<'_, SelectionMap> {
        Cow::Borrowed(&self.selections)
    }
}

/// Loads the trajectory described by `trajectory` and runs every configured pair over it.
#[instrument(skip_all, name = "trajectory_workflow")]
pub fn run(
    config: &SaptConfig,
    trajectory: &TrajectoryConfig,
    repair: &dyn StructureRepair,
    solver: &mut dyn QuantumSolver,
    reporter: &ProgressReporter,
) -> Result<ResultTable, RunFailure> {
    let schema = TableSchema::trajectory();
    trajectory
        .validate()
        .map_err(|e| RunFailure::before_start(e, schema))?;

    info!(topology = %trajectory.topology.display(), "Loading trajectory.");
    let source = PdbTrajectory::from_paths(
        trajectory.topology.as_path(),
        &trajectory
            .trajectories
            .iter()
            .map(|p| p.as_path())
            .collect::<Vec<_>>(),
        trajectory.timestep,
    )
    .map_err(|e| {
        RunFailure::before_start(
            EngineError::Structure {
                key: None,
                pair: None,
                iteration: "load".to_string(),
                reason: e.to_string(),
            },
            schema,
        )
    })?;
    info!(frames = source.len(), "Trajectory loaded.");

    let mut strategy = TrajectorySapt::new(config, source, trajectory.window)
        .map_err(|e| RunFailure::before_start(e, schema))?;
    SaptRunner::new(config, repair, reporter).run(&mut strategy, solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::selection::ResiduePair;
    use crate::engine::calculator::audit_file_name;
    use crate::engine::config::FailurePolicy;
    use crate::engine::error::ErrorKind;
    use crate::engine::repair::ElectronCountRepair;
    use crate::testing::{FakeSolver, residue_structure, sapt_config};
    use std::fs;
    use std::path::PathBuf;

    fn trajectory(keys: &[isize], frames: usize) -> PdbTrajectory {
        let models = (0..frames)
            .map(|i| residue_structure(keys, 0.1 * i as f64))
            .collect();
        PdbTrajectory::from_models(models, 10.0).unwrap()
    }

    fn run_with(
        config: &SaptConfig,
        source: PdbTrajectory,
        solver: &mut FakeSolver,
    ) -> Result<ResultTable, RunFailure> {
        let reporter = ProgressReporter::new();
        let mut strategy = TrajectorySapt::new(config, source, FrameWindow::default()).unwrap();
        SaptRunner::new(config, &ElectronCountRepair, &reporter).run(&mut strategy, solver)
    }

    #[test]
    fn one_row_per_frame_and_pair_in_configured_order() {
        let config = sapt_config(vec![(7, 3), (3, 11)]);
        let mut solver = FakeSolver::default();
        let table = run_with(&config, trajectory(&[3, 7, 11], 3), &mut solver).unwrap();

        assert_eq!(table.len(), 6);
        let labels: Vec<_> = table.rows().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["7-3", "3-11", "7-3", "3-11", "7-3", "3-11"]);
        assert_eq!(table.schema(), TableSchema::trajectory());
    }

    #[test]
    fn two_frames_one_pair_gives_increasing_times() {
        let config = sapt_config(vec![(1, 2)]);
        let table = run_with(&config, trajectory(&[1, 2], 2), &mut FakeSolver::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].iteration, IterationId::Time(0.0));
        assert_eq!(table.rows()[1].iteration, IterationId::Time(10.0));
    }

    #[test]
    fn frames_feed_their_own_coordinates() {
        let config = sapt_config(vec![(1, 2)]);
        let mut solver = FakeSolver::default();
        run_with(&config, trajectory(&[1, 2], 2), &mut solver).unwrap();

        assert!(solver.calls[0].geometry.starts_with("0 1\nO 0 0 0\n"));
        assert!(solver.calls[1].geometry.starts_with("0 1\nO 0.1 0 0\n"));
        assert!(!solver.calls[0].geometry.contains("-10"));
    }

    #[test]
    fn failure_aborts_and_keeps_earlier_frames() {
        let config = sapt_config(vec![(1, 2), (3, 7)]);
        // Frame 5, second pair.
        let mut solver = FakeSolver::failing_at([11]);
        let failure = run_with(&config, trajectory(&[1, 2, 3, 7], 8), &mut solver).unwrap_err();

        assert_eq!(failure.error.kind(), ErrorKind::Solver);
        let message = failure.error.to_string();
        assert!(message.contains("3-7"));
        assert!(message.contains("time 50"));

        let partial = failure.partial;
        assert_eq!(partial.len(), 11);
        let last_full_frame = partial.rows()[9].iteration.clone();
        assert_eq!(last_full_frame, IterationId::Time(40.0));
        assert_eq!(partial.rows()[10].label, "1-2");
        assert_eq!(solver.calls.len(), 12);
    }

    #[test]
    fn record_missing_policy_continues_after_failure() {
        let mut config = sapt_config(vec![(1, 2), (3, 7)]);
        config.failure_policy = FailurePolicy::RecordMissing;
        let mut solver = FakeSolver::failing_at([3]);
        let table = run_with(&config, trajectory(&[1, 2, 3, 7], 3), &mut solver).unwrap();

        assert_eq!(table.len(), 6);
        assert!(table.rows()[3].energies.is_missing());
        assert!(!table.rows()[4].energies.is_missing());
        assert_eq!(table.failures().len(), 1);
        assert_eq!(table.failures()[0].label, "3-7");
        assert_eq!(table.failures()[0].iteration, IterationId::Time(10.0));
    }

    #[test]
    fn unknown_residue_is_rejected_at_construction() {
        let config = sapt_config(vec![(1, 42)]);
        let result = TrajectorySapt::new(&config, trajectory(&[1, 2], 2), FrameWindow::default());
        assert!(matches!(
            result,
            Err(EngineError::Configuration(ConfigError::UnknownResidue(42)))
        ));
    }

    #[test]
    fn water_only_residue_is_not_selectable() {
        let config = sapt_config(vec![(1, 9000)]);
        let result = TrajectorySapt::new(&config, trajectory(&[1], 1), FrameWindow::default());
        assert!(matches!(
            result,
            Err(EngineError::Configuration(ConfigError::UnknownResidue(9000)))
        ));
    }

    #[test]
    fn window_restricts_visited_frames() {
        let config = sapt_config(vec![(1, 2)]);
        let window = FrameWindow {
            start: 1,
            stop: Some(6),
            step: 2,
        };
        let strategy = TrajectorySapt::new(&config, trajectory(&[1, 2], 8), window).unwrap();
        assert_eq!(strategy.frames(), [1, 3, 5]);

        let empty = FrameWindow {
            start: 20,
            stop: None,
            step: 1,
        };
        assert!(matches!(
            TrajectorySapt::new(&config, trajectory(&[1, 2], 8), empty),
            Err(EngineError::Configuration(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn audit_files_are_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = sapt_config(vec![(1, 2)]);
        config.psi4.save_output = true;
        config.output_dir = dir.path().join("audit");

        let mut solver = FakeSolver::default();
        run_with(&config, trajectory(&[1, 2], 2), &mut solver).unwrap();

        let expected: PathBuf = config
            .output_dir
            .join(audit_file_name(&ResiduePair::new(1, 2), "10"));
        assert!(expected.is_file());
        assert_eq!(solver.calls[1].output.as_deref(), Some(expected.as_path()));
        assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 2);
    }

    #[test]
    fn audit_files_are_skipped_by_default() {
        let config = sapt_config(vec![(1, 2)]);
        let mut solver = FakeSolver::default();
        run_with(&config, trajectory(&[1, 2], 1), &mut solver).unwrap();
        assert!(solver.calls[0].output.is_none());
    }

    #[test]
    fn run_loads_pdb_files_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.pdb");
        let mut text = String::new();
        for (model, x) in [(1, 0.0), (2, 0.5)] {
            text.push_str(&format!("MODEL     {:>4}\n", model));
            for (serial, (name, resid, dx)) in
                [("O", 1, 0.0), ("HA", 1, 0.96), ("O", 2, 3.0), ("HA", 2, 3.96)]
                    .iter()
                    .enumerate()
            {
                text.push_str(&format!(
                    "ATOM  {:>5} {:<4} WAT A{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00\n",
                    serial + 1,
                    name,
                    resid,
                    x + dx,
                    0.0,
                    0.0
                ));
            }
            text.push_str("ENDMDL\n");
        }
        fs::write(&path, text).unwrap();

        let config = sapt_config(vec![(1, 2)]);
        let traj_config = TrajectoryConfig {
            topology: path,
            trajectories: Vec::new(),
            timestep: 2.0,
            window: FrameWindow::default(),
        };
        let table = run(
            &config,
            &traj_config,
            &ElectronCountRepair,
            &mut FakeSolver::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].iteration, IterationId::Time(2.0));
    }

    #[test]
    fn run_reports_unreadable_topology_before_any_row() {
        let config = sapt_config(vec![(1, 2)]);
        let traj_config = TrajectoryConfig {
            topology: PathBuf::from("/nonexistent/topology.pdb"),
            trajectories: Vec::new(),
            timestep: 1.0,
            window: FrameWindow::default(),
        };
        let failure = run(
            &config,
            &traj_config,
            &ElectronCountRepair,
            &mut FakeSolver::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert_eq!(failure.error.kind(), ErrorKind::Structure);
        assert!(failure.partial.is_empty());
    }
}
