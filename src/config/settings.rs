use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use toml;

const CONFIG_FILE: &str = "simulation.toml";

/// World-level simulation parameters sent to the engine worker at `init`.
///
/// `report_chunk_size` sizes the worker's report buffers in records; the
/// worker grows them in chunks of this many records as objects are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub gravity: [f32; 3],
    pub fixed_time_step: f32,
    pub max_sub_steps: u32,
    pub report_chunk_size: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 1,
            report_chunk_size: 50,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "simbridge", "simbridge")
        .map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn save_simulation_settings(settings: &SimulationSettings) -> std::io::Result<()> {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, toml)?;
    }
    Ok(())
}

pub fn load_simulation_settings() -> Option<SimulationSettings> {
    if let Some(path) = config_path() {
        if let Ok(data) = fs::read_to_string(path) {
            if let Ok(settings) = toml::from_str::<SimulationSettings>(&data) {
                return Some(settings);
            }
        }
    }
    None
}
