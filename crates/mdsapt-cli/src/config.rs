//! Turning a TOML file plus command-line overrides into a runnable analysis.
//!
//! [`file`] holds the on-disk shape, where every field is optional.
//! [`builder`] layers `--set` values and flags on top, fills the gaps from
//! [`defaults`], and validates the result through the core config builders.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::{AnalysisConfig, AppConfig};

#[cfg(test)]
pub use file::FileConfig;
