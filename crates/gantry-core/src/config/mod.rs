//! Configuration system for gantry

pub mod defaults;
pub mod duration;
pub mod layers;
mod loader;
mod types;
pub mod validation;

pub use defaults::*;
pub use layers::{flag_table, get_path, merge_tables, parse_flag_value, set_path, ConfigLayers};
pub use loader::*;
pub use types::*;
pub use validation::*;
