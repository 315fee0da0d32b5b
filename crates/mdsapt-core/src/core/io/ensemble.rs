use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Failed to list directory '{}': {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No PDB structures found in '{}'", .0.display())]
    Empty(PathBuf),
    #[error("Failed to read structure '{}': {source}", .path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: PdbError,
    },
    #[error("Unknown pose key: '{0}'")]
    UnknownPose(String),
}

/// A collection of independently generated structures addressed by key.
pub trait PoseSource {
    /// All pose keys. Every key appears exactly once.
    fn keys(&self) -> Vec<String>;

    /// Loads the full structure of one pose.
    fn load(&self, key: &str) -> Result<Structure, EnsembleError>;
}

/// A docking ensemble read from PDB files on disk.
#[derive(Debug, Clone)]
pub enum Ensemble {
    /// Each file already holds the protein and the ligand.
    Merged { systems: BTreeMap<String, PathBuf> },
    /// One shared protein; each ligand file is one pose.
    Separate {
        protein: Structure,
        ligands: BTreeMap<String, PathBuf>,
    },
}

fn collect_pdb_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>, EnsembleError> {
    let entries = fs::read_dir(dir).map_err(|source| EnsembleError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|source| EnsembleError::Directory {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_pdb = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdb"));
        if !path.is_file() || !is_pdb {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(stem.to_string(), path.clone());
        }
    }

    if files.is_empty() {
        return Err(EnsembleError::Empty(dir.to_path_buf()));
    }
    Ok(files)
}

fn read_pdb(path: &Path) -> Result<Structure, EnsembleError> {
    PdbFile::read_structure_from_path(path).map_err(|source| EnsembleError::Structure {
        path: path.to_path_buf(),
        source,
    })
}

impl Ensemble {
    pub fn merged<P: AsRef<Path>>(systems_dir: P) -> Result<Self, EnsembleError> {
        Ok(Self::Merged {
            systems: collect_pdb_files(systems_dir.as_ref())?,
        })
    }

    pub fn separate<P: AsRef<Path>, Q: AsRef<Path>>(
        protein_path: P,
        ligands_dir: Q,
    ) -> Result<Self, EnsembleError> {
        Ok(Self::Separate {
            protein: read_pdb(protein_path.as_ref())?,
            ligands: collect_pdb_files(ligands_dir.as_ref())?,
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Merged { systems } => systems.len(),
            Self::Separate { ligands, .. } => ligands.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PoseSource for Ensemble {
    fn keys(&self) -> Vec<String> {
        match self {
            Self::Merged { systems } => systems.keys().cloned().collect(),
            Self::Separate { ligands, .. } => ligands.keys().cloned().collect(),
        }
    }

    fn load(&self, key: &str) -> Result<Structure, EnsembleError> {
        match self {
            Self::Merged { systems } => {
                let path = systems
                    .get(key)
                    .ok_or_else(|| EnsembleError::UnknownPose(key.to_string()))?;
                read_pdb(path)
            }
            Self::Separate { protein, ligands } => {
                let path = ligands
                    .get(key)
                    .ok_or_else(|| EnsembleError::UnknownPose(key.to_string()))?;
                let ligand = read_pdb(path)?;
                let mut complex = protein.clone();
                complex.extend(&ligand);
                Ok(complex)
            }
        }
    }
}
