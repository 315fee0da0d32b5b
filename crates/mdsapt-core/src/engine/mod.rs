//! # Engine Module
//!
//! The per-pair machinery shared by every iteration strategy.
//!
//! - **Configuration** ([`config`]) - run parameters and their builders
//! - **Geometry** ([`geometry`], [`repair`]) - turning a residue selection into solver input
//! - **Calculation** ([`calculator`], [`solver`]) - one SAPT evaluation per residue pair
//! - **Results** ([`table`]) - the row-per-observation output table
//! - **Progress Monitoring** ([`progress`]) - observer callbacks for front ends
//! - **Error Handling** ([`error`]) - the closed set of run failures

pub mod calculator;
pub mod config;
pub mod error;
pub mod geometry;
pub mod progress;
pub mod repair;
pub mod solver;
pub mod table;
