pub mod context;
pub mod events;
pub mod invoker;
pub mod materializer;
pub mod result;

use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::ExecutionError;
use crate::parser::types::Scenario;
use crate::report::{artifacts, correlate, types::RunResults};
use crate::utils::binary_resolver::resolve_runner;
use crate::utils::config::RunSettings;
use context::ExecutionContext;
use materializer::RunConfiguration;

pub use events::*;
pub use result::*;

/// Executes generated scenarios against a live application, one at a time.
///
/// Holds only read-only settings and the event channel; nothing from one
/// execution survives into the next.
pub struct ScenarioExecutor {
    settings: RunSettings,
    emitter: EventEmitter,
}

impl ScenarioExecutor {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            emitter: EventEmitter::default(),
        }
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.emitter.subscribe()
    }

    /// Execute one scenario. Expected failures are reported in the result,
    /// never as a panic or error.
    pub async fn execute(&self, scenario: &Scenario, target_url: &str) -> ExecutionResult {
        self.emitter.emit(ExecutionEvent::ScenarioStarted {
            scenario: scenario.name.clone(),
            index: 0,
            total: 1,
        });
        self.execute_scenario(scenario, target_url).await
    }

    /// Execute scenarios strictly in order, each one fully cleaned up before
    /// the next starts. Setting `stop` skips the scenarios not yet started.
    pub async fn execute_all(
        &self,
        scenarios: &[Scenario],
        target_url: &str,
        stop: &AtomicBool,
    ) -> Vec<ExecutionResult> {
        let started = Instant::now();
        warn_duplicate_names(scenarios);

        self.emitter.emit(ExecutionEvent::BatchStarted {
            total: scenarios.len(),
            target_url: target_url.to_string(),
        });

        let mut results = Vec::with_capacity(scenarios.len());
        let mut stopped_early = false;

        for (index, scenario) in scenarios.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                log::info!(
                    "Stop requested, skipping {} remaining scenario(s)",
                    scenarios.len() - index
                );
                stopped_early = true;
                break;
            }

            self.emitter.emit(ExecutionEvent::ScenarioStarted {
                scenario: scenario.name.clone(),
                index,
                total: scenarios.len(),
            });
            results.push(self.execute_scenario(scenario, target_url).await);
        }

        let summary = BatchSummary::from_results(&results, started.elapsed().as_millis() as u64);
        self.emitter.emit(ExecutionEvent::BatchFinished {
            summary,
            stopped_early,
        });

        results
    }

    async fn execute_scenario(&self, scenario: &Scenario, target_url: &str) -> ExecutionResult {
        let started = Instant::now();
        let mut result = ExecutionResult::new(&scenario.name);

        match ExecutionContext::open(&self.settings.runs_dir, &scenario.name) {
            Ok(context) => {
                self.log(&mut result, format!("Opened execution context {}", context.id()));

                if let Err(e) = self
                    .run_in_context(&context, scenario, target_url, &mut result)
                    .await
                {
                    result.fail(&e);
                }

                self.stage(scenario, events::Stage::Cleanup);
                let root = context.root().to_path_buf();
                match context.close() {
                    Ok(()) => self.log(&mut result, "Removed execution context"),
                    Err(e) => {
                        let message =
                            format!("Failed to remove execution context {}: {}", root.display(), e);
                        log::warn!("{}", message);
                        self.log(&mut result, message);
                    }
                }
            }
            Err(e) => result.fail(&e),
        }

        self.emitter.emit(ExecutionEvent::ScenarioFinished {
            scenario: scenario.name.clone(),
            success: result.success,
            duration_ms: started.elapsed().as_millis() as u64,
            error: result.error.clone(),
        });

        result
    }

    /// materialize → invoke → correlate → resolve artifacts
    async fn run_in_context(
        &self,
        context: &ExecutionContext,
        scenario: &Scenario,
        target_url: &str,
        result: &mut ExecutionResult,
    ) -> Result<(), ExecutionError> {
        self.stage(scenario, events::Stage::Materialize);
        let run_config = RunConfiguration::new(&self.settings, context, target_url);
        materializer::materialize(scenario, &run_config)?;
        let wrote = format!(
            "Wrote {} step(s) to {}",
            scenario.steps.len(),
            materializer::TEST_FILE
        );
        self.log(result, wrote);

        let runner = resolve_runner(&self.settings.runner, &self.settings.workspace_dir)?;
        self.log(result, format!("Using runner: {}", runner));

        self.stage(scenario, events::Stage::Runner);
        let timeout = Duration::from_millis(self.settings.process_timeout_ms);
        let output = invoker::invoke(&runner, context, &run_config, timeout).await?;
        result.stdout = output.stdout;
        result.stderr = output.stderr;

        if output.timed_out {
            return Err(ExecutionError::RunnerTimeout {
                timeout_ms: self.settings.process_timeout_ms,
            });
        }
        let exited = match output.exit_code {
            Some(code) => format!(
                "Runner exited with code {} after {}ms",
                code, output.duration_ms
            ),
            None => format!("Runner terminated after {}ms", output.duration_ms),
        };
        self.log(result, exited);

        self.stage(scenario, events::Stage::Correlate);
        let correlation = correlate::correlate(context, scenario)?;
        result.success = correlation.success;
        result.duration_ms = correlation.duration_ms;
        result.error = correlation.error.clone();
        let finished = format!(
            "Test '{}' finished with status '{}'",
            correlation.title, correlation.status
        );
        self.log(result, finished);

        self.stage(scenario, events::Stage::Artifacts);
        let resolved = artifacts::resolve(
            context,
            &correlation.attachments,
            !correlation.success,
            self.settings.artifact_store.as_deref(),
        );
        for note in resolved.notes {
            self.log(result, note);
        }
        result.screenshot = resolved.screenshot;
        result.video_path = resolved.video_path;
        result.trace_path = resolved.trace_path;
        result.attachments = Some(resolved.attachments);

        Ok(())
    }

    /// Record a log line on the result and publish it to subscribers
    fn log(&self, result: &mut ExecutionResult, message: impl Into<String>) {
        let message = message.into();
        self.emitter.emit(ExecutionEvent::Log {
            scenario: result.scenario.clone(),
            message: message.clone(),
        });
        result.log(message);
    }

    fn stage(&self, scenario: &Scenario, stage: events::Stage) {
        self.emitter.emit(ExecutionEvent::StageStarted {
            scenario: scenario.name.clone(),
            stage,
        });
    }
}

fn warn_duplicate_names(scenarios: &[Scenario]) {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            log::warn!(
                "Scenario name '{}' appears more than once in this batch",
                scenario.name
            );
        }
    }
}

/// Load scenarios from `path`, run them all, and optionally write reports
pub async fn run_scenarios(
    path: &Path,
    url: Option<&str>,
    settings: RunSettings,
    output: &Path,
    report: bool,
    stop: &AtomicBool,
) -> Result<RunResults> {
    let set = crate::parser::load_scenarios(path)?;
    if set.scenarios.is_empty() {
        println!("{} No scenarios found.", "ℹ".blue());
    }

    let target_url = url
        .map(str::to_string)
        .or(set.url)
        .ok_or_else(|| anyhow::anyhow!("No target URL: pass --url or set `url` in the scenario file"))?;

    let executor = ScenarioExecutor::new(settings);
    let listener = tokio::spawn(ConsoleEventListener::listen(executor.subscribe()));

    let started = Instant::now();
    let results = executor
        .execute_all(&set.scenarios, &target_url, stop)
        .await;
    let run_results = RunResults::new(&target_url, results, started.elapsed().as_millis() as u64);

    // Closing the channel ends the listener once it has printed everything
    drop(executor);
    let _ = listener.await;

    if report {
        std::fs::create_dir_all(output)?;
        crate::report::json::write_report(&run_results, output)?;
        crate::report::junit::write_report(&run_results, output)?;
    }

    Ok(run_results)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils::config::RunnerSelection;
    use std::path::PathBuf;

    const LOGIN: &str = "User logs in with valid credentials";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn runs_dir(&self) -> PathBuf {
            self.dir.path().join("runs")
        }

        /// Settings whose runner is `sh <script>`
        fn settings(&self, script: &str) -> RunSettings {
            let script_path = self.dir.path().join("fake-runner.sh");
            std::fs::write(&script_path, script).unwrap();
            RunSettings {
                workspace_dir: self.dir.path().to_path_buf(),
                runs_dir: self.runs_dir(),
                runner: RunnerSelection::Command {
                    program: PathBuf::from("sh"),
                    args: vec![script_path.to_string_lossy().into_owned()],
                },
                artifact_store: Some(self.dir.path().join("artifacts")),
                ..RunSettings::default()
            }
        }

        fn leftover_contexts(&self) -> usize {
            std::fs::read_dir(self.runs_dir())
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn login_scenario() -> Scenario {
        Scenario::new(
            LOGIN,
            vec![
                r#"navigate to "/""#.to_string(),
                r#"fill "email" with "a@b.com""#.to_string(),
                r#"fill "password" with "secret""#.to_string(),
                r#"click "Login""#.to_string(),
                r#"assert text "Welcome" visible"#.to_string(),
            ],
        )
    }

    fn report_script(title: &str, result: &str) -> String {
        format!(
            "cat > \"$PLAYWRIGHT_JSON_OUTPUT_NAME\" <<'EOF'\n\
             {{\"suites\":[{{\"title\":\"scenario.spec.js\",\"specs\":[{{\"title\":{},\"tests\":[{{\"results\":[{}]}}]}}]}}]}}\n\
             EOF\n",
            serde_json::to_string(title).unwrap(),
            result
        )
    }

    #[tokio::test]
    async fn test_passing_scenario() {
        let fixture = Fixture::new();
        let script = format!(
            "grep -q 'click \"Login\"' scenario.spec.js || exit 3\n\
             grep -q 'https://example.test' playwright.config.js || exit 4\n\
             {}echo '1 passed'\n",
            report_script(
                &format!("should successfully complete: {}", LOGIN),
                r#"{"status":"passed","duration":842,"attachments":[]}"#
            )
        );
        let executor = ScenarioExecutor::new(fixture.settings(&script));

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.duration_ms, Some(842));
        assert_eq!(result.error, None);
        assert_eq!(result.scenario, LOGIN);
        assert!(result.stdout.contains("1 passed"));
        assert!(result.screenshot.is_none());
        assert_eq!(fixture.leftover_contexts(), 0);
    }

    #[tokio::test]
    async fn test_log_lines_are_published() {
        let fixture = Fixture::new();
        let script = report_script(
            &format!("should successfully complete: {}", LOGIN),
            r#"{"status":"passed","duration":5}"#,
        );
        let executor = ScenarioExecutor::new(fixture.settings(&script));
        let mut events = executor.subscribe();

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        let mut published = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ExecutionEvent::Log { scenario, message } = event {
                assert_eq!(scenario, LOGIN);
                published.push(message);
            }
        }
        assert!(result.success, "{:?}", result);
        assert!(!published.is_empty());
        assert_eq!(published, result.logs);
    }

    #[tokio::test]
    async fn test_failed_assertion_with_artifacts() {
        let fixture = Fixture::new();
        let store = fixture.dir.path().join("kept");
        let script = format!(
            "mkdir -p test-results/login\n\
             printf 'PNGDATA' > test-results/login/test-failed-1.png\n\
             printf 'WEBM' > test-results/login/video.webm\n\
             {}echo '1 failed'\nexit 1\n",
            report_script(
                &format!("should successfully complete: {}", LOGIN),
                r#"{"status":"failed","duration":1200,
                    "error":{"message":"expect(locator).toBeVisible() failed"},
                    "attachments":[
                      {"name":"screenshot","contentType":"image/png","path":"login/test-failed-1.png"},
                      {"name":"video","contentType":"video/webm","path":"login/video.webm"}]}"#
                    .replace('\n', " ")
                    .as_str()
            )
        );
        let mut settings = fixture.settings(&script);
        settings.artifact_store = Some(store.clone());
        let executor = ScenarioExecutor::new(settings);

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(!result.success);
        assert_eq!(result.duration_ms, Some(1200));
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("toBeVisible() failed"));
        assert!(result.stdout.contains("1 failed"));
        assert_eq!(
            result.screenshot.as_deref(),
            Some("data:image/png;base64,UE5HREFUQQ==")
        );

        let video = PathBuf::from(result.video_path.as_deref().unwrap());
        assert!(video.starts_with(&store));
        assert_eq!(std::fs::read(&video).unwrap(), b"WEBM");
        assert_eq!(result.attachments.as_ref().unwrap().len(), 2);
        assert_eq!(fixture.leftover_contexts(), 0);
    }

    #[tokio::test]
    async fn test_missing_report_is_reported_not_thrown() {
        let fixture = Fixture::new();
        let executor = ScenarioExecutor::new(fixture.settings("exit 0\n"));

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("Report not found"));
        assert!(error.contains("report.json"));
        assert_eq!(fixture.leftover_contexts(), 0);
    }

    #[tokio::test]
    async fn test_title_mismatch_lists_titles() {
        let fixture = Fixture::new();
        let script = report_script("some other test", r#"{"status":"passed"}"#);
        let executor = ScenarioExecutor::new(fixture.settings(&script));

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains(LOGIN));
        assert!(error.contains("some other test"));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let fixture = Fixture::new();
        let mut settings = fixture.settings("");
        settings.runner = RunnerSelection::Command {
            program: PathBuf::from("/nonexistent/playwright"),
            args: vec![],
        };
        let executor = ScenarioExecutor::new(settings);

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("Failed to launch test runner"));
        assert_eq!(fixture.leftover_contexts(), 0);
    }

    #[tokio::test]
    async fn test_context_creation_failure() {
        let fixture = Fixture::new();
        let mut settings = fixture.settings("exit 0\n");
        let blocker = fixture.dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        settings.runs_dir = blocker;
        let executor = ScenarioExecutor::new(settings);

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("Failed to create execution context"));
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_logged_not_escalated() {
        use std::os::unix::fs::PermissionsExt;

        // Permission bits do not stop root from removing the tree
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let fixture = Fixture::new();
        let script = format!(
            "mkdir -p locked/inner\ntouch locked/inner/kept\nchmod 555 locked\n{}",
            report_script(
                &format!("should successfully complete: {}", LOGIN),
                r#"{"status":"passed","duration":42}"#
            )
        );
        let executor = ScenarioExecutor::new(fixture.settings(&script));

        let result = executor
            .execute(&login_scenario(), "https://example.test")
            .await;

        // Let the temp dir clean up after itself
        for entry in std::fs::read_dir(fixture.runs_dir()).unwrap() {
            let locked = entry.unwrap().path().join("locked");
            if locked.exists() {
                std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        assert!(result.success, "{:?}", result);
        assert_eq!(result.error, None);
        assert_eq!(result.duration_ms, Some(42));
        assert!(result
            .logs
            .iter()
            .any(|line| line.starts_with("Failed to remove execution context")));
    }

    #[tokio::test]
    async fn test_timeout_does_not_affect_next_scenario() {
        let fixture = Fixture::new();
        let script = format!(
            "if grep -q SLOW scenario.spec.js; then echo waiting; sleep 30; fi\n{}",
            report_script(
                "should successfully complete: B",
                r#"{"status":"passed","duration":10}"#
            )
        );
        let mut settings = fixture.settings(&script);
        settings.process_timeout_ms = 1000;
        let executor = ScenarioExecutor::new(settings);

        let scenarios = vec![
            Scenario::new("A", vec!["// SLOW".to_string()]),
            Scenario::new("B", vec!["// fast".to_string()]),
        ];
        let stop = AtomicBool::new(false);
        let results = executor
            .execute_all(&scenarios, "https://example.test", &stop)
            .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(results[0].stdout.trim(), "waiting");
        assert!(results[1].success, "{:?}", results[1]);
        assert_eq!(results[1].duration_ms, Some(10));
        assert_eq!(fixture.leftover_contexts(), 0);
    }

    #[tokio::test]
    async fn test_stop_flag_skips_remaining() {
        let fixture = Fixture::new();
        let executor = ScenarioExecutor::new(fixture.settings("exit 0\n"));
        let mut events = executor.subscribe();

        let stop = AtomicBool::new(true);
        let results = executor
            .execute_all(&[login_scenario()], "https://example.test", &stop)
            .await;

        assert!(results.is_empty());
        let mut stopped = false;
        while let Ok(event) = events.try_recv() {
            if let ExecutionEvent::BatchFinished { stopped_early, .. } = event {
                stopped = stopped_early;
            }
        }
        assert!(stopped);
    }
}
