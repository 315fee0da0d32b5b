use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown element symbol: '{0}'")]
pub struct UnknownElement(pub String);

/// A chemical element, identified by its atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element {
    atomic_number: u8,
}

static SYMBOLS: [&str; 54] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe",
];

static ATOMIC_NUMBERS: Map<&'static str, u8> = phf_map! {
    "H" => 1, "HE" => 2, "LI" => 3, "BE" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "NE" => 10, "NA" => 11, "MG" => 12, "AL" => 13, "SI" => 14, "P" => 15,
    "S" => 16, "CL" => 17, "AR" => 18, "K" => 19, "CA" => 20, "SC" => 21, "TI" => 22,
    "V" => 23, "CR" => 24, "MN" => 25, "FE" => 26, "CO" => 27, "NI" => 28, "CU" => 29,
    "ZN" => 30, "GA" => 31, "GE" => 32, "AS" => 33, "SE" => 34, "BR" => 35, "KR" => 36,
    "RB" => 37, "SR" => 38, "Y" => 39, "ZR" => 40, "NB" => 41, "MO" => 42, "TC" => 43,
    "RU" => 44, "RH" => 45, "PD" => 46, "AG" => 47, "CD" => 48, "IN" => 49, "SN" => 50,
    "SB" => 51, "TE" => 52, "I" => 53, "XE" => 54,
};

// Two-letter prefixes that are read as elements when guessing from atom names.
// Anything else falls back to the first letter, so "CA" stays carbon.
static NAME_PREFIX_ELEMENTS: Map<&'static str, u8> = phf_map! {
    "CL" => 17, "BR" => 35, "NA" => 11, "MG" => 12, "ZN" => 30, "FE" => 26,
    "MN" => 25, "CU" => 29, "LI" => 3,
};

impl Element {
    pub const HYDROGEN: Element = Element { atomic_number: 1 };
    pub const CARBON: Element = Element { atomic_number: 6 };
    pub const NITROGEN: Element = Element { atomic_number: 7 };
    pub const OXYGEN: Element = Element { atomic_number: 8 };
    pub const SULFUR: Element = Element { atomic_number: 16 };

    pub fn from_atomic_number(atomic_number: u8) -> Option<Self> {
        if atomic_number >= 1 && (atomic_number as usize) <= SYMBOLS.len() {
            Some(Self { atomic_number })
        } else {
            None
        }
    }

    pub fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    pub fn symbol(&self) -> &'static str {
        SYMBOLS[(self.atomic_number - 1) as usize]
    }

    /// Infers the element of an atom from its name when no explicit element
    /// column is available.
    ///
    /// Leading and trailing digits are stripped (`1HB` → `HB`), then a known
    /// two-letter prefix is tried before falling back to the first letter.
    pub fn guess_from_atom_name(name: &str) -> Option<Self> {
        let letters: String = name
            .trim()
            .trim_matches(|c: char| c.is_ascii_digit())
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if letters.len() >= 2 {
            if let Some(&z) = NAME_PREFIX_ELEMENTS.get(&letters[..2]) {
                return Self::from_atomic_number(z);
            }
        }
        let first = letters.get(..1)?;
        ATOMIC_NUMBERS
            .get(first)
            .and_then(|&z| Self::from_atomic_number(z))
    }
}

impl FromStr for Element {
    type Err = UnknownElement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        ATOMIC_NUMBERS
            .get(key.as_str())
            .and_then(|&z| Self::from_atomic_number(z))
            .ok_or_else(|| UnknownElement(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
