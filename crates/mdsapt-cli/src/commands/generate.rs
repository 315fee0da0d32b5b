use crate::cli::{GenerateArgs, TemplateKind};
use crate::error::{CliError, Result};
use std::fs;
use tracing::info;

const SHARED_SECTIONS: &str = r#"# Residue pairs to evaluate, as [first, second] residue numbers.
pairs = [[3, 7], [7, 11]]

# What to do when a pair fails: "abort" or "record-missing".
on-failure = "abort"

# CSV file receiving one row per pair per iteration.
output = "sapt_results.csv"

[psi4]
method = "sapt0"
basis = "jun-cc-pvdz"
# Keep the Psi4 transcript of every pair evaluation in `output-dir`.
save-output = false
output-dir = "sapt_output"
# executable = "/path/to/psi4"

# Extra options written to the Psi4 `set` block.
[psi4.settings]
reference = "rhf"
freeze_core = true

[system-limits]
ncpus = 4
memory = "4GB"
"#;

const TRAJECTORY_ANALYSIS: &str = r#"
[analysis]
type = "trajectory"
topology = "topology.pdb"
# Multi-model PDB files read in order. Leave empty to use the models in `topology`.
trajectories = ["production.pdb"]
# Picoseconds between consecutive frames.
timestep = 10.0
# Frame window, as start..stop by step. Omit `stop` to run to the last frame.
start = 0
step = 1
"#;

const DOCKING_ANALYSIS: &str = r#"
[analysis]
type = "docking"
# "merged": one PDB per pose with protein and ligand together.
# "separate": one protein PDB plus one PDB per ligand pose.
mode = "merged"
combined-topologies = "poses"
# protein = "protein.pdb"
# ligands = "ligands"
"#;

pub fn template(kind: TemplateKind) -> String {
    let analysis = match kind {
        TemplateKind::Trajectory => TRAJECTORY_ANALYSIS,
        TemplateKind::Docking => DOCKING_ANALYSIS,
    };
    format!("{}{}", SHARED_SECTIONS, analysis)
}

pub fn run(args: GenerateArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(CliError::Argument(format!(
            "'{}' already exists. Use --force to overwrite it.",
            args.output.display()
        )));
    }

    info!("Writing {:?} template to {:?}", args.kind, &args.output);
    fs::write(&args.output, template(args.kind))?;
    println!("✓ Template written to: {}", args.output.display());
    Ok(())
}
