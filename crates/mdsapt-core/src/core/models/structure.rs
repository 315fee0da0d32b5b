use super::atom::Atom;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Coordinate count mismatch: structure has {expected} atoms but {found} positions were given")]
pub struct CoordinateMismatch {
    pub expected: usize,
    pub found: usize,
}

/// An ordered collection of atoms representing one molecular snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    atoms: Vec<Atom>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Appends all atoms of `other`, keeping their residue numbering.
    pub fn extend(&mut self, other: &Structure) {
        self.atoms.extend(other.atoms.iter().cloned());
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Returns a copy of this structure with every atom moved to the matching
    /// entry of `positions`.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Result<Self, CoordinateMismatch> {
        if positions.len() != self.atoms.len() {
            return Err(CoordinateMismatch {
                expected: self.atoms.len(),
                found: positions.len(),
            });
        }
        let atoms = self
            .atoms
            .iter()
            .zip(positions)
            .map(|(atom, &position)| Atom {
                position,
                ..atom.clone()
            })
            .collect();
        Ok(Self { atoms })
    }

    /// Indices of the atoms of residue `residue_number`, excluding water atoms.
    pub fn residue_atom_indices(&self, residue_number: isize) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, atom)| atom.residue_number == residue_number && !atom.is_water())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_residue_structure() -> Structure {
        Structure::from_atoms(vec![
            Atom::new("N", 1, Point3::new(0.0, 0.0, 0.0)),
            Atom::new("CA", 1, Point3::new(1.5, 0.0, 0.0)),
            Atom::new("OH2", 1, Point3::new(5.0, 5.0, 5.0)),
            Atom::new("N", 2, Point3::new(3.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn residue_atom_indices_excludes_water_names() {
        let structure = two_residue_structure();
        assert_eq!(structure.residue_atom_indices(1), vec![0, 1]);
        assert_eq!(structure.residue_atom_indices(2), vec![3]);
        assert!(structure.residue_atom_indices(9).is_empty());
    }

    #[test]
    fn with_positions_replaces_coordinates_only() {
        let structure = two_residue_structure();
        let moved: Vec<_> = (0..4).map(|i| Point3::new(i as f64, 1.0, 2.0)).collect();
        let updated = structure.with_positions(&moved).unwrap();
        assert_eq!(updated.atom(3).unwrap().position, Point3::new(3.0, 1.0, 2.0));
        assert_eq!(updated.atom(3).unwrap().name, "N");
        assert_eq!(structure.atom(3).unwrap().position, Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn with_positions_rejects_wrong_length() {
        let structure = two_residue_structure();
        let err = structure.with_positions(&[Point3::origin()]).unwrap_err();
        assert_eq!(err, CoordinateMismatch { expected: 4, found: 1 });
    }

    #[test]
    fn extend_appends_atoms_in_order() {
        let mut protein = two_residue_structure();
        let ligand = Structure::from_atoms(vec![Atom::new("C1", 900, Point3::origin())]);
        protein.extend(&ligand);
        assert_eq!(protein.len(), 5);
        assert_eq!(protein.atom(4).unwrap().residue_number, 900);
    }
}
