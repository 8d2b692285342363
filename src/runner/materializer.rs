//! Renders a scenario into a Playwright test file plus a run configuration
//! inside an execution context.

use crate::error::ExecutionError;
use crate::parser::types::Scenario;
use crate::runner::context::ExecutionContext;
use crate::utils::config::RunSettings;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const TEST_FILE: &str = "scenario.spec.js";
pub const CONFIG_FILE: &str = "playwright.config.js";
const TITLE_PREFIX: &str = "should successfully complete: ";

/// Everything the runner needs for one execution, derived fresh per run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub base_url: String,
    pub browser: String,
    pub headless: bool,
    pub test_timeout_ms: u64,
    pub expect_timeout_ms: u64,
    pub artifacts_dir: PathBuf,
    pub report_path: PathBuf,
    pub config_path: PathBuf,
    pub test_path: PathBuf,
}

impl RunConfiguration {
    pub fn new(settings: &RunSettings, context: &ExecutionContext, target_url: &str) -> Self {
        Self {
            base_url: target_url.to_string(),
            browser: settings.browser.as_str().to_string(),
            headless: settings.headless,
            test_timeout_ms: settings.test_timeout_ms,
            expect_timeout_ms: settings.expect_timeout_ms,
            artifacts_dir: context.artifacts_dir().to_path_buf(),
            report_path: context.report_path().to_path_buf(),
            config_path: context.root().join(CONFIG_FILE),
            test_path: context.root().join(TEST_FILE),
        }
    }

    /// Body of `playwright.config.js`
    pub fn render(&self) -> String {
        let config = json!({
            "testDir": ".",
            "testMatch": TEST_FILE,
            "timeout": self.test_timeout_ms,
            "expect": { "timeout": self.expect_timeout_ms },
            "retries": 0,
            "workers": 1,
            "fullyParallel": false,
            "outputDir": self.artifacts_dir,
            "reporter": [["json", { "outputFile": self.report_path }]],
            "use": {
                "baseURL": self.base_url,
                "browserName": self.browser,
                "headless": self.headless,
                "screenshot": "only-on-failure",
                "video": "retain-on-failure",
                "trace": "retain-on-failure",
            },
        });

        // serde_json output is a valid JS object literal
        let body = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
        format!("// Generated by lumi-scenario\nmodule.exports = {};\n", body)
    }
}

/// Title the runner reports for `scenario_name`; used as the correlation key
pub fn test_title(scenario_name: &str) -> String {
    format!("{}{}", TITLE_PREFIX, scenario_name)
}

/// Render the test file: one test case, steps in order
pub fn render_test_file(scenario: &Scenario) -> String {
    let mut body = String::new();
    for step in &scenario.steps {
        for line in step.lines() {
            if line.trim().is_empty() {
                body.push('\n');
            } else {
                body.push_str("  ");
                body.push_str(line);
                body.push('\n');
            }
        }
    }

    format!(
        "const {{ test, expect }} = require('@playwright/test');\n\n\
         test('{}', async ({{ page }}) => {{\n{}}});\n",
        escape_js_string(&test_title(&scenario.name)),
        body
    )
}

/// Write the test file and run configuration into the context
pub fn materialize(
    scenario: &Scenario,
    run_config: &RunConfiguration,
) -> Result<(), ExecutionError> {
    write_file(&run_config.test_path, &render_test_file(scenario))?;
    write_file(&run_config.config_path, &run_config.render())?;
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<(), ExecutionError> {
    std::fs::write(path, content).map_err(|source| ExecutionError::Materialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Escape text for a single-quoted JavaScript string literal
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_js_string`]
pub fn unescape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
