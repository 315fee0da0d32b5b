//! # Core Module
//!
//! The stateless foundation of MD-SAPT: molecular data models and the readers
//! that turn structure files into snapshots for the engine.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, elements, structures, residue selections
//! - **File I/O** ([`io`]) - PDB parsing, trajectory frames and docking ensembles
//!
//! Nothing in this module talks to a quantum-chemistry program; that is the
//! job of [`crate::engine`].

pub mod io;
pub mod models;
