use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::{CoordinateMismatch, Structure};
use nalgebra::Point3;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("Failed to read trajectory: {0}")]
    Pdb(#[from] PdbError),
    #[error("Frame {index} is out of range (trajectory has {len} frames)")]
    FrameOutOfRange { index: usize, len: usize },
    #[error("Frame {index} does not match the topology: {source}")]
    Topology {
        index: usize,
        #[source]
        source: CoordinateMismatch,
    },
}

/// One time step of a trajectory.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based position of the frame in the full trajectory.
    pub index: usize,
    /// Simulation time in picoseconds.
    pub time: f64,
    /// The topology with this frame's coordinates applied.
    pub structure: Structure,
}

/// A time-ordered sequence of coordinate sets sharing one topology.
pub trait Trajectory {
    fn topology(&self) -> &Structure;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads frame `index`. Frame times increase strictly with `index`.
    fn read_frame(&self, index: usize) -> Result<Frame, TrajectoryError>;
}

/// Selects which frames of a trajectory are visited, as `start..stop` by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWindow {
    pub start: usize,
    pub stop: Option<usize>,
    pub step: usize,
}

impl Default for FrameWindow {
    fn default() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }
}

impl FrameWindow {
    /// Frame indices visited for a trajectory of `len` frames, in increasing order.
    /// A `step` of zero yields no frames.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        if self.step == 0 {
            return Vec::new();
        }
        let stop = self.stop.map_or(len, |s| s.min(len));
        (self.start..stop).step_by(self.step).collect()
    }
}

/// A trajectory held in memory, read from one or more multi-model PDB files.
#[derive(Debug, Clone)]
pub struct PdbTrajectory {
    topology: Structure,
    frames: Vec<Vec<Point3<f64>>>,
    timestep: f64,
}

impl PdbTrajectory {
    /// Builds a trajectory whose topology is the first model and whose
    /// frames are all models, `timestep` picoseconds apart.
    pub fn from_models(models: Vec<Structure>, timestep: f64) -> Result<Self, TrajectoryError> {
        let topology = models
            .first()
            .cloned()
            .ok_or_else(|| PdbError::MissingRecord("MODEL".into()))?;
        let frames = models.iter().map(Structure::positions).collect();
        Self::with_frames(topology, frames, timestep)
    }

    fn with_frames(
        topology: Structure,
        frames: Vec<Vec<Point3<f64>>>,
        timestep: f64,
    ) -> Result<Self, TrajectoryError> {
        for (index, positions) in frames.iter().enumerate() {
            if positions.len() != topology.len() {
                return Err(TrajectoryError::Topology {
                    index,
                    source: CoordinateMismatch {
                        expected: topology.len(),
                        found: positions.len(),
                    },
                });
            }
        }
        Ok(Self {
            topology,
            frames,
            timestep,
        })
    }

    /// Loads the topology from the first model of `topology_path` and the
    /// frames from `trajectory_paths` in order. With no trajectory files, the
    /// models of the topology file itself are the frames.
    pub fn from_paths<P: AsRef<Path>>(
        topology_path: P,
        trajectory_paths: &[P],
        timestep: f64,
    ) -> Result<Self, TrajectoryError> {
        let topology_models = PdbFile::read_models_from_path(topology_path)?;
        if trajectory_paths.is_empty() {
            return Self::from_models(topology_models, timestep);
        }
        let topology = topology_models
            .into_iter()
            .next()
            .ok_or_else(|| PdbError::MissingRecord("MODEL".into()))?;
        let mut frames = Vec::new();
        for path in trajectory_paths {
            for model in PdbFile::read_models_from_path(path)? {
                frames.push(model.positions());
            }
        }
        Self::with_frames(topology, frames, timestep)
    }
}

impl Trajectory for PdbTrajectory {
    fn topology(&self) -> &Structure {
        &self.topology
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&self, index: usize) -> Result<Frame, TrajectoryError> {
        let positions = self
            .frames
            .get(index)
            .ok_or(TrajectoryError::FrameOutOfRange {
                index,
                len: self.frames.len(),
            })?;
        let structure = self
            .topology
            .with_positions(positions)
            .map_err(|source| TrajectoryError::Topology { index, source })?;
        Ok(Frame {
            index,
            time: index as f64 * self.timestep,
            structure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use std::fs;
    use tempfile::tempdir;

    fn model(x: f64) -> Structure {
        Structure::from_atoms(vec![
            Atom::new("N", 1, Point3::new(x, 0.0, 0.0)),
            Atom::new("N", 2, Point3::new(x + 3.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn window_defaults_to_every_frame() {
        assert_eq!(FrameWindow::default().indices(4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn window_applies_start_stop_and_step() {
        let window = FrameWindow {
            start: 1,
            stop: Some(8),
            step: 3,
        };
        assert_eq!(window.indices(10), vec![1, 4, 7]);
        assert_eq!(window.indices(5), vec![1, 4]);
    }

    #[test]
    fn window_with_zero_step_is_empty() {
        let window = FrameWindow {
            step: 0,
            ..Default::default()
        };
        assert!(window.indices(10).is_empty());
    }

    #[test]
    fn frame_time_is_index_times_timestep() {
        let traj = PdbTrajectory::from_models(vec![model(0.0), model(1.0), model(2.0)], 10.0)
            .unwrap();
        assert_eq!(traj.len(), 3);
        let frame = traj.read_frame(2).unwrap();
        assert_eq!(frame.time, 20.0);
        assert_eq!(frame.structure.atom(0).unwrap().position.x, 2.0);
    }

    #[test]
    fn read_frame_out_of_range_fails() {
        let traj = PdbTrajectory::from_models(vec![model(0.0)], 1.0).unwrap();
        assert!(matches!(
            traj.read_frame(5),
            Err(TrajectoryError::FrameOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let short = Structure::from_atoms(vec![Atom::new("N", 1, Point3::origin())]);
        let result = PdbTrajectory::from_models(vec![model(0.0), short], 1.0);
        assert!(matches!(
            result,
            Err(TrajectoryError::Topology { index: 1, .. })
        ));
    }

    #[test]
    fn from_paths_reads_frames_from_trajectory_files() {
        let dir = tempdir().unwrap();
        let top = dir.path().join("top.pdb");
        let traj = dir.path().join("traj.pdb");
        let atom = |x: &str| {
            format!("ATOM      1  CA  ALA A   1    {x}   0.000   0.000  1.00  0.00           C\n")
        };
        fs::write(&top, atom("   0.000")).unwrap();
        fs::write(
            &traj,
            format!(
                "MODEL        1\n{}ENDMDL\nMODEL        2\n{}ENDMDL\n",
                atom("   1.000"),
                atom("   2.000")
            ),
        )
        .unwrap();

        let trajectory = PdbTrajectory::from_paths(&top, &[&traj], 2.0).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.topology().atom(0).unwrap().position.x, 0.0);
        let frame = trajectory.read_frame(1).unwrap();
        assert_eq!(frame.time, 2.0);
        assert_eq!(frame.structure.atom(0).unwrap().position.x, 2.0);
    }
}
