//! Reading molecular structures for SAPT calculations.
//!
//! [`pdb`] parses single- and multi-model PDB files behind the
//! [`traits::StructureFile`] interface. [`trajectory`] turns a topology plus
//! coordinate models into time-ordered frames, and [`ensemble`] exposes a
//! directory of docking poses as a keyed collection.

pub mod ensemble;
pub mod pdb;
pub mod trajectory;
pub mod traits;
