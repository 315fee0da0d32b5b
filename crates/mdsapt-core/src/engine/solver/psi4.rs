use super::{QuantumSolver, SolverError, SolverVariables};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

const INPUT_FILE: &str = "input.dat";
const OUTPUT_FILE: &str = "output.dat";
const VARIABLES_FILE: &str = "variables.dat";

const CONVERGENCE_MARKERS: [&str; 2] = ["ConvergenceError", "Could not converge"];

/// Runs Psi4 as a child process, one temporary work directory per call.
#[derive(Debug, Clone)]
pub struct Psi4Process {
    executable: PathBuf,
    options: BTreeMap<String, String>,
    memory: Option<String>,
    threads: usize,
    output_file: Option<PathBuf>,
}

impl Default for Psi4Process {
    fn default() -> Self {
        Self::new("psi4")
    }
}

impl Psi4Process {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            options: BTreeMap::new(),
            memory: None,
            threads: 1,
            output_file: None,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn render_input(
        &self,
        method_basis: &str,
        geometry: &str,
        variables_path: &Path,
    ) -> Result<String, fmt::Error> {
        let mut input = String::new();
        if let Some(memory) = &self.memory {
            writeln!(input, "memory {}\n", memory)?;
        }

        writeln!(input, "molecule dimer {{")?;
        for line in geometry.lines() {
            writeln!(input, "{}", line)?;
        }
        writeln!(input, "}}\n")?;

        if !self.options.is_empty() {
            writeln!(input, "set {{")?;
            for (key, value) in &self.options {
                writeln!(input, "  {} {}", key, value)?;
            }
            writeln!(input, "}}\n")?;
        }

        writeln!(input, "energy('{}', molecule=dimer)\n", method_basis)?;

        writeln!(
            input,
            "with open({:?}, 'w') as _vars_out:",
            variables_path.display().to_string()
        )?;
        input.push_str("    for _name, _value in sorted(psi4.core.variables().items()):\n");
        input.push_str("        if isinstance(_value, float):\n");
        input.push_str("            _vars_out.write('%s=%r\\n' % (_name, _value))\n");
        Ok(input)
    }

    fn run(&self, input: &Path, output: &Path) -> Result<std::process::Output, SolverError> {
        debug!(
            executable = %self.executable.display(),
            threads = self.threads,
            "Launching Psi4"
        );
        Command::new(&self.executable)
            .arg("-n")
            .arg(self.threads.to_string())
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SolverError::NotFound {
                    command: self.executable.display().to_string(),
                },
                _ => SolverError::Io(e),
            })
    }
}

/// Psi4 transcripts may carry non-UTF-8 bytes; they are decoded lossily.
fn read_transcript(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Psi4 transcript could not be read");
            String::new()
        }
    }
}

fn convergence_failure(text: &str) -> Option<String> {
    text.lines()
        .find(|line| CONVERGENCE_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| line.trim().to_string())
}

fn parse_variables(content: &str, path: &Path) -> Result<SolverVariables, SolverError> {
    let mut vars = SolverVariables::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parse_error = |reason: &str| SolverError::Parse {
            path: path.to_path_buf(),
            line: i + 1,
            reason: reason.to_string(),
        };
        let (name, value) = line
            .rsplit_once('=')
            .ok_or_else(|| parse_error("expected NAME=VALUE"))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| parse_error("value is not a number"))?;
        vars.insert(name.trim(), value);
    }
    Ok(vars)
}

impl QuantumSolver for Psi4Process {
    fn set_options(&mut self, options: &BTreeMap<String, String>) {
        self.options = options.clone();
    }

    fn set_memory(&mut self, memory: &str) {
        self.memory = Some(memory.to_string());
    }

    fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    fn set_output_file(&mut self, path: Option<&Path>) {
        self.output_file = path.map(Path::to_path_buf);
    }

    fn energy(
        &mut self,
        method_basis: &str,
        geometry: &str,
    ) -> Result<SolverVariables, SolverError> {
        let work_dir = tempfile::Builder::new().prefix("mdsapt-psi4-").tempdir()?;
        let input_path = work_dir.path().join(INPUT_FILE);
        let variables_path = work_dir.path().join(VARIABLES_FILE);
        let output_path = self
            .output_file
            .clone()
            .unwrap_or_else(|| work_dir.path().join(OUTPUT_FILE));

        fs::write(
            &input_path,
            self.render_input(method_basis, geometry, &variables_path)?,
        )?;

        let result = self.run(&input_path, &output_path)?;
        let transcript = read_transcript(&output_path);
        let stderr = String::from_utf8_lossy(&result.stderr);

        if let Some(line) =
            convergence_failure(&stderr).or_else(|| convergence_failure(&transcript))
        {
            return Err(SolverError::NotConverged(line));
        }
        if !result.status.success() {
            warn!(status = %result.status, "Psi4 exited unsuccessfully");
            return Err(SolverError::Failed {
                status: result.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let content = match fs::read_to_string(&variables_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SolverError::Failed {
                    status: result.status.to_string(),
                    stderr: "no variables were written".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        parse_variables(&content, &variables_path)
    }
}
