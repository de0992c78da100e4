pub mod settings;

pub use settings::{load_simulation_settings, save_simulation_settings, SimulationSettings};
