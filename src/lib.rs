pub mod error;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::ExecutionError;
pub use parser::Scenario;
pub use report::generate_report;
pub use runner::{run_scenarios, ExecutionResult, ScenarioExecutor};
pub use utils::config::RunSettings;
