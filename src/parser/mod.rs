pub mod types;
pub mod yaml;

pub use types::{Scenario, ScenarioSet};
pub use yaml::load_scenarios;
