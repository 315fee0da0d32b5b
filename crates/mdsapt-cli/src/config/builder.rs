use super::defaults::DefaultsConfig;
use super::file::{
    FileAnalysisConfig, FileConfig, FileDockingConfig, FileTrajectoryConfig, setting_value,
};
use super::models::{AnalysisConfig, AppConfig};
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use mdsapt::core::io::trajectory::FrameWindow;
use mdsapt::core::models::selection::ResiduePair;
use mdsapt::engine::config::{
    DockingConfig, DockingStructureMode, FailurePolicy, SaptConfigBuilder, TrajectoryConfig,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    // Relative paths in the file are relative to the file itself.
    let base_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let psi4 = file_config.psi4.take().unwrap_or_default();
    let limits = file_config.system_limits.take().unwrap_or_default();

    let pairs: Vec<ResiduePair> = file_config
        .pairs
        .take()
        .ok_or_else(|| CliError::Config("`pairs` is required.".to_string()))?
        .into_iter()
        .map(ResiduePair::from)
        .collect();

    let failure_policy = match args.on_failure.as_deref().or(file_config.on_failure.as_deref()) {
        Some(raw) => raw
            .parse::<FailurePolicy>()
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => FailurePolicy::default(),
    };

    let settings: BTreeMap<String, String> = psi4
        .settings
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), setting_value(v)))
        .collect();

    let output_dir = resolve(
        &base_dir,
        psi4.output_dir.unwrap_or(defaults.output_dir),
    );

    let mut builder = SaptConfigBuilder::new()
        .settings(settings)
        .memory(
            args.memory
                .clone()
                .or(limits.memory)
                .unwrap_or(defaults.memory),
        )
        .ncpus(args.ncpus.or(limits.ncpus).unwrap_or(defaults.ncpus))
        .pairs(pairs)
        .failure_policy(failure_policy)
        .save_output(args.save_output || psi4.save_output.unwrap_or(defaults.save_output))
        .output_dir(output_dir);
    if let Some(method) = psi4.method {
        builder = builder.method(method);
    }
    if let Some(basis) = psi4.basis {
        builder = builder.basis(basis);
    }
    let sapt = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    let analysis = match file_config.analysis.take() {
        Some(FileAnalysisConfig::Trajectory(t)) => {
            AnalysisConfig::Trajectory(build_trajectory(t, &base_dir, defaults.timestep)?)
        }
        Some(FileAnalysisConfig::Docking(d)) => {
            AnalysisConfig::Docking(build_docking(d, &base_dir)?)
        }
        None => {
            return Err(CliError::Config(
                "`[analysis]` section is required.".to_string(),
            ));
        }
    };

    let output_path = args
        .output
        .clone()
        .or_else(|| file_config.output.map(|p| resolve(&base_dir, p)))
        .unwrap_or(defaults.output);

    Ok(AppConfig {
        sapt,
        analysis,
        psi4_executable: args
            .psi4
            .clone()
            .or(psi4.executable)
            .unwrap_or(defaults.psi4_executable),
        output_path,
    })
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn build_trajectory(
    file: FileTrajectoryConfig,
    base_dir: &Path,
    default_timestep: f64,
) -> Result<TrajectoryConfig> {
    let topology = file
        .topology
        .ok_or_else(|| CliError::Config("`analysis.topology` is required.".to_string()))?;
    let window = FrameWindow {
        start: file.start.unwrap_or(0),
        stop: file.stop,
        step: file.step.unwrap_or(1),
    };
    let config = TrajectoryConfig {
        topology: resolve(base_dir, topology),
        trajectories: file
            .trajectories
            .unwrap_or_default()
            .into_iter()
            .map(|p| resolve(base_dir, p))
            .collect(),
        timestep: file.timestep.unwrap_or(default_timestep),
        window,
    };
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

fn build_docking(file: FileDockingConfig, base_dir: &Path) -> Result<DockingConfig> {
    let mode = file
        .mode
        .map(|m| m.parse::<DockingStructureMode>())
        .transpose()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(DockingConfig {
        mode,
        combined_topologies: file.combined_topologies.map(|p| resolve(base_dir, p)),
        protein: file.protein.map(|p| resolve(base_dir, p)),
        ligands: file.ligands.map(|p| resolve(base_dir, p)),
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;

        if let Some(option) = key.strip_prefix("psi4.settings.") {
            config
                .psi4
                .get_or_insert_with(Default::default)
                .settings
                .get_or_insert_with(Default::default)
                .insert(option.to_string(), toml::Value::String(value_str.to_string()));
            continue;
        }

        match key {
            "psi4.method" => {
                config.psi4.get_or_insert_with(Default::default).method =
                    Some(value_str.to_string());
            }
            "psi4.basis" => {
                config.psi4.get_or_insert_with(Default::default).basis =
                    Some(value_str.to_string());
            }
            "psi4.save-output" => {
                config.psi4.get_or_insert_with(Default::default).save_output =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "system-limits.ncpus" => {
                config
                    .system_limits
                    .get_or_insert_with(Default::default)
                    .ncpus = Some(parse_value(key, value_str, "integer")?);
            }
            "system-limits.memory" => {
                config
                    .system_limits
                    .get_or_insert_with(Default::default)
                    .memory = Some(value_str.to_string());
            }
            "on-failure" => config.on_failure = Some(value_str.to_string()),
            "analysis.timestep" | "analysis.start" | "analysis.stop" | "analysis.step" => {
                let Some(FileAnalysisConfig::Trajectory(t)) = config.analysis.as_mut() else {
                    return Err(CliError::Config(format!(
                        "'{}' applies only to trajectory analyses",
                        key
                    )));
                };
                match key {
                    "analysis.timestep" => t.timestep = Some(parse_value(key, value_str, "float")?),
                    "analysis.start" => t.start = Some(parse_value(key, value_str, "integer")?),
                    "analysis.stop" => t.stop = Some(parse_value(key, value_str, "integer")?),
                    _ => t.step = Some(parse_value(key, value_str, "integer")?),
                }
            }
            "analysis.mode" => {
                let Some(FileAnalysisConfig::Docking(d)) = config.analysis.as_mut() else {
                    return Err(CliError::Config(format!(
                        "'{}' applies only to docking analyses",
                        key
                    )));
                };
                d.mode = Some(value_str.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
