//! Preparing residue fragments for quantum-chemical treatment.
//!
//! A residue cut out of a protein is rarely a closed-shell molecule as-is.
//! [`StructureRepair`] is the seam through which missing atoms are added and
//! the fragment's charge and spin multiplicity are decided.

use crate::core::models::selection::Fragment;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepairError {
    #[error("Atom '{name}' (serial {serial}) has no element type")]
    MissingElement { name: String, serial: usize },
    #[error("Fragment has a negative electron count ({0})")]
    NegativeElectronCount(i64),
    #[error("Cannot determine protonation state: {0}")]
    Ambiguous(String),
}

pub trait StructureRepair {
    /// Returns the fragment with missing atoms (typically protons) added.
    fn rebuild(&self, fragment: Fragment) -> Result<Fragment, RepairError>;

    /// Net formal charge of a repaired fragment.
    fn formal_charge(&self, fragment: &Fragment) -> Result<i32, RepairError>;

    /// Spin multiplicity (2S + 1) of a repaired fragment.
    fn spin_multiplicity(&self, fragment: &Fragment) -> Result<u32, RepairError>;
}

/// Treats fragments as already complete.
///
/// The charge is the sum of per-atom formal charges and the multiplicity
/// follows from electron-count parity: singlet when even, doublet when odd.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElectronCountRepair;

impl ElectronCountRepair {
    fn electron_count(fragment: &Fragment, charge: i32) -> Result<i64, RepairError> {
        let mut protons: i64 = 0;
        for atom in &fragment.atoms {
            let element = atom.element.ok_or_else(|| RepairError::MissingElement {
                name: atom.name.clone(),
                serial: atom.serial,
            })?;
            protons += i64::from(element.atomic_number());
        }
        let electrons = protons - i64::from(charge);
        if electrons < 0 {
            return Err(RepairError::NegativeElectronCount(electrons));
        }
        Ok(electrons)
    }
}

impl StructureRepair for ElectronCountRepair {
    fn rebuild(&self, fragment: Fragment) -> Result<Fragment, RepairError> {
        Ok(fragment)
    }

    fn formal_charge(&self, fragment: &Fragment) -> Result<i32, RepairError> {
        Ok(fragment
            .atoms
            .iter()
            .map(|a| i32::from(a.formal_charge))
            .sum())
    }

    fn spin_multiplicity(&self, fragment: &Fragment) -> Result<u32, RepairError> {
        let charge = self.formal_charge(fragment)?;
        let electrons = Self::electron_count(fragment, charge)?;
        Ok(if electrons % 2 == 0 { 1 } else { 2 })
    }
}
