use super::atom::Atom;
use super::structure::Structure;
use std::fmt;

/// A residue-keyed group of atoms within one structure.
///
/// Only atom indices are stored, so a selection resolved against a trajectory
/// topology stays valid for every frame of that trajectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomSelection {
    key: isize,
    indices: Vec<usize>,
}

impl AtomSelection {
    /// Selects the non-water atoms of residue `key`. Returns `None` when the
    /// residue has no such atoms.
    pub fn resolve(structure: &Structure, key: isize) -> Option<Self> {
        let indices = structure.residue_atom_indices(key);
        if indices.is_empty() {
            None
        } else {
            Some(Self { key, indices })
        }
    }

    pub fn key(&self) -> isize {
        self.key
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Copies the selected atoms out of `structure` in selection order.
    ///
    /// Indices past the end of `structure` are skipped; callers resolve the
    /// selection against a structure with the same atom layout.
    pub fn fragment(&self, structure: &Structure) -> Fragment {
        Fragment {
            key: self.key,
            atoms: self
                .indices
                .iter()
                .filter_map(|&i| structure.atom(i).cloned())
                .collect(),
        }
    }
}

/// An owned copy of a selection's atoms at one point of the iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub key: isize,
    pub atoms: Vec<Atom>,
}

/// An ordered pair of residue keys whose interaction energy is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResiduePair {
    pub first: isize,
    pub second: isize,
}

impl ResiduePair {
    pub fn new(first: isize, second: isize) -> Self {
        Self { first, second }
    }

    /// `"<first>-<second>"`, preserving configured order.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResiduePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl From<(isize, isize)> for ResiduePair {
    fn from((first, second): (isize, isize)) -> Self {
        Self { first, second }
    }
}
