//! # Core Models Module
//!
//! Plain data structures describing molecular snapshots and the atom groups
//! that SAPT calculations are run between.
//!
//! ## Key Components
//!
//! - [`element`] - Element table and name-based element guessing
//! - [`atom`] - A single atom with residue membership, element and position
//! - [`structure`] - An ordered snapshot of atoms (one frame or one pose)
//! - [`selection`] - Residue selections, owned fragments and residue pairs
//!
//! ## Usage
//!
//! ```ignore
//! use mdsapt::core::models::{atom::Atom, structure::Structure, selection::AtomSelection};
//!
//! let structure = Structure::from_atoms(vec![Atom::new("CA", 12, Point3::origin())]);
//! let selection = AtomSelection::resolve(&structure, 12).expect("residue 12 exists");
//! let fragment = selection.fragment(&structure);
//! ```

pub mod atom;
pub mod element;
pub mod selection;
pub mod structure;
