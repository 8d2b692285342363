use std::path::PathBuf;
use thiserror::Error;

/// Failure categories of a single scenario execution.
///
/// None of these cross the executor boundary as `Err`; each one is folded into
/// the returned [`ExecutionResult`](crate::runner::ExecutionResult).
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to create execution context at {}: {source}", .path.display())]
    ContextCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {} into execution context: {source}", .path.display())]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find a test runner. Checked:\n{}", .checked.join("\n"))]
    RunnerNotFound { checked: Vec<String> },

    #[error("Failed to launch test runner '{program}': {source}")]
    RunnerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Test runner timed out after {timeout_ms}ms and was killed")]
    RunnerTimeout { timeout_ms: u64 },

    #[error("Report not found at {}: {source}", .path.display())]
    ReportMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report at {} could not be parsed: {source}", .path.display())]
    ReportUnparsable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}", title_not_found_message(.title, .available, .report_errors))]
    TitleNotFound {
        title: String,
        available: Vec<String>,
        report_errors: Vec<String>,
    },

    #[error("Report contains {count} specs titled '{title}', refusing to pick one")]
    AmbiguousTitle { title: String, count: usize },

    #[error("Spec '{title}' has no recorded test result")]
    NoResult { title: String },
}

fn title_not_found_message(title: &str, available: &[String], report_errors: &[String]) -> String {
    let mut message = format!("No test titled '{}' found in report.", title);
    if available.is_empty() {
        message.push_str(" Report contains no tests.");
    } else {
        message.push_str(&format!(" Titles present: {}", available.join(", ")));
    }
    if !report_errors.is_empty() {
        message.push_str(&format!("\nRunner errors:\n{}", report_errors.join("\n")));
    }
    message
}
