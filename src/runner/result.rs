use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};

/// Runner artifact attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// The report referenced a file that does not exist
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub missing: bool,
}

/// Outcome of executing one scenario, returned to the caller exactly once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub scenario: String,
    pub success: bool,
    pub logs: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Inline `data:` URI of the failure screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl ExecutionResult {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            ..Default::default()
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{}] {}", self.scenario, message);
        self.logs.push(message);
    }

    /// Record a terminal failure for this execution
    pub fn fail(&mut self, error: &ExecutionError) {
        let message = error.to_string();
        log::warn!("[{}] {}", self.scenario, message);
        self.logs.push(format!("Error: {}", message));
        self.success = false;
        self.error = Some(message);
    }
}

/// Totals over a batch of executions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn from_results(results: &[ExecutionResult], duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count() as u32;
        Self {
            total: results.len() as u32,
            passed,
            failed: results.len() as u32 - passed,
            duration_ms,
        }
    }
}
