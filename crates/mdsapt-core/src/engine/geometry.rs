use super::repair::{RepairError, StructureRepair};
use crate::core::models::selection::AtomSelection;
use crate::core::models::structure::Structure;
use std::fmt;
use thiserror::Error;

/// Failure to turn one selection into a geometry block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Residue {key}: {source}")]
pub struct StructureError {
    pub key: isize,
    #[source]
    pub source: RepairError,
}

/// Solver-ready text for one fragment: a `<charge> <multiplicity>` line
/// followed by one `<element> <x> <y> <z>` line per atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryBlock {
    key: isize,
    charge: i32,
    multiplicity: u32,
    text: String,
}

impl GeometryBlock {
    pub fn key(&self) -> isize {
        self.key
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Wraps pre-rendered text, reading charge and multiplicity from its header.
    #[cfg(test)]
    pub(crate) fn from_text(key: isize, text: &str) -> Self {
        let mut header = text.lines().next().unwrap_or("0 1").split_whitespace();
        let charge = header.next().and_then(|c| c.parse().ok()).unwrap_or(0);
        let multiplicity = header.next().and_then(|m| m.parse().ok()).unwrap_or(1);
        Self {
            key,
            charge,
            multiplicity,
            text: text.to_string(),
        }
    }
}

impl fmt::Display for GeometryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct GeometryBuilder<'a> {
    repair: &'a dyn StructureRepair,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(repair: &'a dyn StructureRepair) -> Self {
        Self { repair }
    }

    /// Builds the geometry of `selection` using the coordinates of `structure`.
    ///
    /// The result depends only on its inputs, so an unchanged snapshot
    /// always produces identical text.
    pub fn build(
        &self,
        selection: &AtomSelection,
        structure: &Structure,
    ) -> Result<GeometryBlock, StructureError> {
        let key = selection.key();
        let wrap = |source: RepairError| StructureError { key, source };

        let fragment = self.repair.rebuild(selection.fragment(structure)).map_err(wrap)?;

        let mut body = String::new();
        for atom in &fragment.atoms {
            let element = atom.element.ok_or_else(|| {
                wrap(RepairError::MissingElement {
                    name: atom.name.clone(),
                    serial: atom.serial,
                })
            })?;
            let p = atom.position;
            body.push_str(&format!("\n{} {} {} {}", element.symbol(), p.x, p.y, p.z));
        }

        let charge = self.repair.formal_charge(&fragment).map_err(wrap)?;
        let multiplicity = self.repair.spin_multiplicity(&fragment).map_err(wrap)?;

        Ok(GeometryBlock {
            key,
            charge,
            multiplicity,
            text: format!("{} {}{}", charge, multiplicity, body),
        })
    }
}
