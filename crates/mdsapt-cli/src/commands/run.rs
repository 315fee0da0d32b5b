use crate::cli::RunArgs;
use crate::config::{AnalysisConfig, AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use mdsapt::engine::progress::ProgressReporter;
use mdsapt::engine::repair::ElectronCountRepair;
use mdsapt::engine::solver::Psi4Process;
use mdsapt::engine::table::ResultTable;
use mdsapt::workflows::{self, RunFailure};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    info!("Building configuration from {:?}", &args.config);
    let config = build_config(&args)?;
    info!(
        analysis = config.analysis.name(),
        method = %config.sapt.method_basis(),
        pairs = config.sapt.pairs.len(),
        "Configuration ready."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting {} SAPT analysis ({}, {} pair(s))...",
        config.analysis.name(),
        config.sapt.method_basis(),
        config.sapt.pairs.len()
    );

    match execute(&config, &reporter) {
        Ok(table) => {
            write_table(&table, &config.output_path)?;
            println!(
                "✓ {} row(s) written to: {}",
                table.len(),
                config.output_path.display()
            );
            if !table.failures().is_empty() {
                warn!(
                    "{} pair evaluation(s) failed and were recorded as missing.",
                    table.failures().len()
                );
                println!(
                    "  {} pair evaluation(s) failed; their energies are recorded as NaN.",
                    table.failures().len()
                );
                for failure in table.failures() {
                    println!(
                        "    {} @ {}: {}",
                        failure.label,
                        failure.iteration.describe(),
                        failure.message
                    );
                }
            }
            Ok(())
        }
        Err(RunFailure { error, partial }) => {
            if !partial.is_empty() {
                write_table(&partial, &config.output_path)?;
                println!(
                    "Run aborted. {} completed row(s) written to: {}",
                    partial.len(),
                    config.output_path.display()
                );
            }
            Err(error.into())
        }
    }
}

fn execute(
    config: &AppConfig,
    reporter: &ProgressReporter,
) -> std::result::Result<ResultTable, RunFailure> {
    let repair = ElectronCountRepair;
    let mut solver = Psi4Process::new(&config.psi4_executable);
    info!(executable = %solver.executable().display(), "Using Psi4 executable.");

    match &config.analysis {
        AnalysisConfig::Trajectory(trajectory) => {
            workflows::trajectory::run(&config.sapt, trajectory, &repair, &mut solver, reporter)
        }
        AnalysisConfig::Docking(docking) => {
            workflows::docking::run(&config.sapt, docking, &repair, &mut solver, reporter)
        }
    }
}

fn write_table(table: &ResultTable, path: &Path) -> Result<()> {
    info!("Writing {} row(s) to {:?}", table.len(), path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    table.to_csv_path(path).map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })
}
