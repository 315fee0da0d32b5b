use std::path::PathBuf;

pub struct DefaultsConfig {
    pub psi4_executable: PathBuf,
    pub output: PathBuf,
    pub output_dir: PathBuf,
    pub ncpus: usize,
    pub memory: String,
    pub timestep: f64,
    pub save_output: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            psi4_executable: PathBuf::from("psi4"),
            output: PathBuf::from("sapt_results.csv"),
            output_dir: PathBuf::from("sapt_output"),
            ncpus: 1,
            memory: "2GB".to_string(),
            timestep: 1.0,
            save_output: false,
        }
    }
}
