use super::calculator::EnergyResult;
use super::error::{EngineError, ErrorKind};
use crate::core::models::selection::ResiduePair;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const ENERGY_COLUMNS: [&str; 5] = [
    "total",
    "electrostatic",
    "exchange",
    "induction",
    "dispersion",
];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Identity of one unit of iteration: a trajectory time or a pose key.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationId {
    Time(f64),
    Pose(String),
}

impl IterationId {
    /// Human-readable form used in log lines and error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Time(t) => format!("time {}", t),
            Self::Pose(key) => format!("pose {}", key),
        }
    }
}

impl fmt::Display for IterationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(t) => write!(f, "{}", t),
            Self::Pose(key) => f.write_str(key),
        }
    }
}

/// Names of the two identity columns that precede the energy columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub label_column: &'static str,
    pub iteration_column: &'static str,
}

impl TableSchema {
    pub const fn trajectory() -> Self {
        Self {
            label_column: "pair_label",
            iteration_column: "time",
        }
    }

    pub const fn docking() -> Self {
        Self {
            label_column: "structure_label",
            iteration_column: "pose_key",
        }
    }

    pub fn columns(&self) -> [&'static str; 7] {
        let [t, el, ex, ind, disp] = ENERGY_COLUMNS;
        [self.label_column, self.iteration_column, t, el, ex, ind, disp]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub label: String,
    pub iteration: IterationId,
    pub energies: EnergyResult,
}

/// A pair evaluation that failed under the record-missing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    pub label: String,
    pub iteration: IterationId,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    label: &'a str,
    iteration: String,
    total: f64,
    electrostatic: f64,
    exchange: f64,
    induction: f64,
    dispersion: f64,
}

impl<'a> From<&'a ResultRow> for CsvRecord<'a> {
    fn from(row: &'a ResultRow) -> Self {
        let e = &row.energies;
        Self {
            label: &row.label,
            iteration: row.iteration.to_string(),
            total: e.total,
            electrostatic: e.electrostatic,
            exchange: e.exchange,
            induction: e.induction,
            dispersion: e.dispersion,
        }
    }
}

/// Rows collected while a run is in progress.
#[derive(Debug)]
pub struct ResultAccumulator {
    schema: TableSchema,
    rows: Vec<ResultRow>,
    failures: Vec<EvaluationFailure>,
}

impl ResultAccumulator {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, pair: &ResiduePair, iteration: &IterationId, energies: EnergyResult) {
        self.rows.push(ResultRow {
            label: pair.label(),
            iteration: iteration.clone(),
            energies,
        });
    }

    /// Appends a NaN row for `pair` and records why it is missing.
    pub fn push_missing(&mut self, pair: &ResiduePair, iteration: &IterationId, error: &EngineError) {
        self.push(pair, iteration, EnergyResult::missing());
        self.failures.push(EvaluationFailure {
            label: pair.label(),
            iteration: iteration.clone(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(self) -> ResultTable {
        ResultTable {
            schema: self.schema,
            rows: self.rows,
            failures: self.failures,
        }
    }
}

/// The finalized output of a run. Rows are in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    schema: TableSchema,
    rows: Vec<ResultRow>,
    failures: Vec<EvaluationFailure>,
}

impl ResultTable {
    pub fn schema(&self) -> TableSchema {
        self.schema
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn failures(&self) -> &[EvaluationFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(self.schema.columns())?;
        for row in &self.rows {
            wtr.serialize(CsvRecord::from(row))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))
    }
}
