use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Invalid formal charge in columns 79-80 (value: '{0}')")]
    InvalidCharge(String),
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
    #[error("Nested MODEL record without a preceding ENDMDL")]
    NestedModel,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len()))
        .unwrap_or("")
        .trim()
}

/// Parses the PDB formal charge field, written as `2+`/`1-` (or `+2`/`-1`).
fn parse_formal_charge(field: &str) -> Option<i8> {
    if field.is_empty() {
        return Some(0);
    }
    let (digits, sign) = if let Some(d) = field.strip_suffix('+') {
        (d, 1)
    } else if let Some(d) = field.strip_suffix('-') {
        (d, -1)
    } else if let Some(d) = field.strip_prefix('+') {
        (d, 1)
    } else if let Some(d) = field.strip_prefix('-') {
        (d, -1)
    } else {
        (field, 1)
    };
    let magnitude: i8 = if digits.is_empty() {
        1
    } else {
        digits.parse().ok()?
    };
    Some(sign * magnitude)
}

pub struct PdbFile;

impl PdbFile {
    fn parse_atom_line(line: &str, line_num: usize) -> Result<Atom, PdbError> {
        if line.len() < 54 {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::LineTooShort,
            });
        }

        let serial_str = slice_and_trim(line, 6, 11);
        let name_str = slice_and_trim(line, 12, 16);
        let res_name_str = slice_and_trim(line, 17, 20);
        let chain_id_str = slice_and_trim(line, 21, 22);
        let res_seq_str = slice_and_trim(line, 22, 26);
        let element_str = slice_and_trim(line, 76, 78);
        let charge_str = slice_and_trim(line, 78, 80);

        let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidInt {
                columns: "7-11".into(),
                value: serial_str.into(),
            },
        })?;
        let residue_number: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidInt {
                columns: "23-26".into(),
                value: res_seq_str.into(),
            },
        })?;

        let coord = |start: usize, end: usize, columns: &str| -> Result<f64, PdbError> {
            let raw = slice_and_trim(line, start, end);
            raw.parse().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidFloat {
                    columns: columns.into(),
                    value: raw.into(),
                },
            })
        };
        let x = coord(30, 38, "31-38")?;
        let y = coord(38, 46, "39-46")?;
        let z = coord(46, 54, "47-54")?;

        let formal_charge = parse_formal_charge(charge_str).ok_or_else(|| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidCharge(charge_str.into()),
        })?;

        // An unreadable element column falls back to guessing from the name,
        // which is what topologies without element columns rely on.
        let element = element_str
            .parse::<Element>()
            .ok()
            .or_else(|| Element::guess_from_atom_name(name_str));

        Ok(Atom {
            serial,
            name: name_str.to_string(),
            residue_name: res_name_str.to_string(),
            residue_number,
            chain_id: chain_id_str.chars().next().unwrap_or('A'),
            element,
            formal_charge,
            position: Point3::new(x, y, z),
        })
    }
}

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_models(reader: &mut impl BufRead) -> Result<Vec<Structure>, Self::Error> {
        let mut models = Vec::new();
        let mut current = Structure::new();
        let mut in_model = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => current.push(Self::parse_atom_line(&line, line_num)?),
                "MODEL" => {
                    if in_model {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::NestedModel,
                        });
                    }
                    in_model = true;
                }
                "ENDMDL" | "END" => {
                    in_model = false;
                    if !current.is_empty() {
                        models.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            }
        }

        if !current.is_empty() {
            models.push(current);
        }
        if models.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok(models)
    }
}
