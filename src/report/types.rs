use crate::runner::result::{BatchSummary, ExecutionResult};
use serde::{Deserialize, Serialize};

/// Results of one `run` invocation, as written to `results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub session_id: String,
    pub target_url: String,
    pub results: Vec<ExecutionResult>,
    pub summary: BatchSummary,
    pub generated_at: String,
}

impl RunResults {
    /// `duration_ms` is the wall-clock time of the whole batch
    pub fn new(target_url: &str, results: Vec<ExecutionResult>, duration_ms: u64) -> Self {
        let summary = BatchSummary::from_results(&results, duration_ms);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            target_url: target_url.to_string(),
            results,
            summary,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_batch_wall_time() {
        let mut passed = ExecutionResult::new("a");
        passed.success = true;
        passed.duration_ms = Some(100);
        // Timed-out runs carry no test duration but still took time
        let timed_out = ExecutionResult::new("b");

        let results = RunResults::new("https://example.test", vec![passed, timed_out], 1_250);

        assert_eq!(results.summary.duration_ms, 1_250);
        assert_eq!((results.summary.passed, results.summary.failed), (1, 1));
        assert!(!results.all_passed());
    }
}
