use super::playwright::{ReportAttachment, ReportResult, RunnerReport};
use crate::error::ExecutionError;
use crate::parser::types::Scenario;
use crate::runner::context::ExecutionContext;
use crate::runner::materializer::test_title;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Outcome of the one test result matching the executed scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub title: String,
    pub success: bool,
    pub status: String,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub attachments: Vec<ReportAttachment>,
}

/// Read the context's report and pick out the result for `scenario`
pub fn correlate(
    context: &ExecutionContext,
    scenario: &Scenario,
) -> Result<Correlation, ExecutionError> {
    let report = load_report(context.report_path())?;
    correlate_report(&report, &test_title(&scenario.name))
}

/// Load the runner's JSON report; absent and malformed files are both errors
pub fn load_report(path: &Path) -> Result<RunnerReport, ExecutionError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExecutionError::ReportMissing {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExecutionError::ReportUnparsable {
        path: path.to_path_buf(),
        source,
    })
}

/// Find the spec titled `title` and map its first result.
///
/// More than one spec with the same title is rejected rather than resolved
/// by document order.
pub fn correlate_report(report: &RunnerReport, title: &str) -> Result<Correlation, ExecutionError> {
    let specs = report.find_specs(title);
    let spec = match specs.as_slice() {
        [] => {
            return Err(ExecutionError::TitleNotFound {
                title: title.to_string(),
                available: report.spec_titles(),
                report_errors: report
                    .error_messages()
                    .iter()
                    .map(|m| strip_ansi(m))
                    .collect(),
            })
        }
        [spec] => *spec,
        many => {
            return Err(ExecutionError::AmbiguousTitle {
                title: title.to_string(),
                count: many.len(),
            })
        }
    };

    // Single attempt: retries are disabled in the generated config
    let result = spec
        .tests
        .first()
        .and_then(|test| test.results.first())
        .ok_or_else(|| ExecutionError::NoResult {
            title: title.to_string(),
        })?;

    let success = result.status == "passed";
    let error = if success {
        None
    } else {
        Some(error_message(result))
    };

    Ok(Correlation {
        title: title.to_string(),
        success,
        status: result.status.clone(),
        duration_ms: result.duration.map(|d| d.max(0.0).round() as u64),
        error,
        attachments: result.attachments.clone(),
    })
}

/// `error.message`, else the joined `errors[]`, else the status itself
fn error_message(result: &ReportResult) -> String {
    if let Some(text) = result.error.as_ref().and_then(|e| e.text()) {
        return strip_ansi(text);
    }

    let messages: Vec<String> = result
        .errors
        .iter()
        .filter_map(|e| e.text())
        .map(strip_ansi)
        .collect();
    if !messages.is_empty() {
        return messages.join("\n");
    }

    if result.status.trim().is_empty() {
        "unknown".to_string()
    } else {
        result.status.clone()
    }
}

/// Remove terminal colour sequences the runner embeds in messages
pub fn strip_ansi(text: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());
    re.replace_all(text, "").into_owned()
}
