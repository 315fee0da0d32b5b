//! # MD-SAPT Core Library
//!
//! Pairwise Symmetry-Adapted Perturbation Theory (SAPT) energy decomposition
//! over molecular-dynamics trajectories and docking ensembles.
//!
//! The library is organized in three layers:
//!
//! - **[`core`]: The Foundation.** Atoms, elements, structures and residue
//!   selections, plus readers for PDB files, multi-model trajectories and
//!   docking ensembles.
//!
//! - **[`engine`]: The Per-Pair Machinery.** Turns a residue selection into a
//!   charged, spin-assigned geometry, runs the quantum-chemistry solver on a
//!   residue pair, and collects the five SAPT components into a result table.
//!
//! - **[`workflows`]: The Public API.** Drives the engine over every frame of
//!   a trajectory or every pose of an ensemble and returns the finished table.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
mod testing;
