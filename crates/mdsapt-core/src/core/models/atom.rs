use super::element::Element;
use nalgebra::Point3;

/// Atom names that identify solvent water and are never part of a residue selection.
pub const WATER_ATOM_NAMES: [&str; 3] = ["OH2", "H1", "H2"];

/// An atom as read from a structure file.
///
/// Residue membership is carried by value (`residue_number`, `residue_name`,
/// `chain_id`) so that atoms can be moved between structures, e.g. when a
/// ligand is appended to a shared protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Serial number from the source file.
    pub serial: usize,
    /// The atom name (e.g., "CA", "OG1").
    pub name: String,
    /// Name of the parent residue (e.g., "SER").
    pub residue_name: String,
    /// Residue sequence number; this is the key residue selections use.
    pub residue_number: isize,
    pub chain_id: char,
    /// `None` when the element could neither be read nor guessed.
    pub element: Option<Element>,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(name: &str, residue_number: isize, position: Point3<f64>) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            residue_name: String::new(),
            residue_number,
            chain_id: 'A',
            element: Element::guess_from_atom_name(name),
            formal_charge: 0,
            position,
        }
    }

    pub fn with_element(mut self, element: Option<Element>) -> Self {
        self.element = element;
        self
    }

    pub fn with_formal_charge(mut self, charge: i8) -> Self {
        self.formal_charge = charge;
        self
    }

    pub fn is_water(&self) -> bool {
        WATER_ATOM_NAMES.contains(&self.name.trim())
    }
}
