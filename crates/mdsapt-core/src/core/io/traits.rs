use crate::core::models::structure::Structure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading molecular structure file formats.
///
/// A file may hold several models (e.g. the frames of a multi-model PDB);
/// implementors return them in file order.
pub trait StructureFile {
    /// The error type for I/O and parsing operations.
    type Error: Error + From<io::Error>;

    /// Reads every model from a buffered reader, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the input holds no atoms.
    fn read_models(reader: &mut impl BufRead) -> Result<Vec<Structure>, Self::Error>;

    /// Reads only the first model.
    fn read_structure(reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        Self::read_models(reader)?.into_iter().next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "input holds no models").into()
        })
    }

    fn read_models_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Structure>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_models(&mut reader)
    }

    fn read_structure_from_path<P: AsRef<Path>>(path: P) -> Result<Structure, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_structure(&mut reader)
    }
}
