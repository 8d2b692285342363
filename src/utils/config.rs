use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Browser engine the runner launches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "chromium" | "chrome" => Some(BrowserType::Chromium),
            "firefox" => Some(BrowserType::Firefox),
            "webkit" | "safari" => Some(BrowserType::Webkit),
            _ => None,
        }
    }
}

/// How the test runner executable is located
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunnerSelection {
    /// Local install, then PATH, then `npx`
    #[default]
    Auto,
    /// Explicit program plus leading arguments
    Command {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Settings shared by every scenario execution of a session.
///
/// These are read-only once the executor is built. Per-run values (paths of
/// the execution context, target URL) are derived into a fresh
/// [`RunConfiguration`](crate::runner::materializer::RunConfiguration) each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunSettings {
    /// Directory the runner resolves `node_modules` from
    pub workspace_dir: PathBuf,

    /// Base directory holding one sub-directory per execution context
    pub runs_dir: PathBuf,

    pub runner: RunnerSelection,

    pub browser: BrowserType,

    pub headless: bool,

    /// Per-test timeout written into the runner config (ms)
    pub test_timeout_ms: u64,

    /// Per-assertion timeout written into the runner config (ms)
    pub expect_timeout_ms: u64,

    /// Wall-clock limit for the runner subprocess (ms)
    pub process_timeout_ms: u64,

    /// Where video/trace of failed runs are copied before cleanup.
    /// `null` keeps them only inside the (deleted) execution context.
    pub artifact_store: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        let workspace_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let runs_dir = workspace_dir.join(".lumi-runs");
        let artifact_store = Some(workspace_dir.join(".lumi-artifacts"));

        Self {
            workspace_dir,
            runs_dir,
            runner: RunnerSelection::Auto,
            browser: BrowserType::Chromium,
            headless: true,
            test_timeout_ms: 60_000,
            expect_timeout_ms: 10_000,
            process_timeout_ms: 120_000,
            artifact_store,
        }
    }
}

impl RunSettings {
    /// Load settings from a YAML file, missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: RunSettings = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(settings)
    }

    /// Saturates instead of overflowing for absurd values
    pub fn set_process_timeout_secs(&mut self, secs: u64) {
        self.process_timeout_ms = secs.saturating_mul(1000);
    }

    /// Apply `LUMI_HEADLESS` and `LUMI_RUNNER` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("LUMI_HEADLESS") {
            self.headless = value == "true" || value == "1";
        }
        if let Ok(program) = std::env::var("LUMI_RUNNER") {
            if !program.trim().is_empty() {
                self.runner = RunnerSelection::Command {
                    program: PathBuf::from(program.trim()),
                    args: Vec::new(),
                };
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunSettings::default();
        assert!(settings.headless);
        assert_eq!(settings.test_timeout_ms, 60_000);
        assert_eq!(settings.expect_timeout_ms, 10_000);
        assert_eq!(settings.process_timeout_ms, 120_000);
        assert!(settings.runs_dir.ends_with(".lumi-runs"));
        assert_eq!(settings.runner, RunnerSelection::Auto);
        assert_eq!(
            settings.artifact_store,
            Some(settings.workspace_dir.join(".lumi-artifacts"))
        );
    }

    #[test]
    fn test_artifact_store_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumi.yaml");
        std::fs::write(&path, "artifactStore: null\n").unwrap();

        let settings = RunSettings::from_file(&path).unwrap();
        assert_eq!(settings.artifact_store, None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumi.yaml");
        std::fs::write(
            &path,
            r#"
browser: firefox
processTimeoutMs: 5000
runner:
  type: command
  program: /opt/pw/bin/playwright
"#,
        )
        .unwrap();

        let settings = RunSettings::from_file(&path).unwrap();
        assert_eq!(settings.browser, BrowserType::Firefox);
        assert_eq!(settings.process_timeout_ms, 5000);
        assert_eq!(settings.test_timeout_ms, 60_000);
        assert_eq!(
            settings.runner,
            RunnerSelection::Command {
                program: PathBuf::from("/opt/pw/bin/playwright"),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_process_timeout_secs() {
        let mut settings = RunSettings::default();
        settings.set_process_timeout_secs(90);
        assert_eq!(settings.process_timeout_ms, 90_000);
        settings.set_process_timeout_secs(u64::MAX);
        assert_eq!(settings.process_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_browser_parse() {
        assert_eq!(BrowserType::parse("Chrome"), Some(BrowserType::Chromium));
        assert_eq!(BrowserType::parse("webkit"), Some(BrowserType::Webkit));
        assert_eq!(BrowserType::parse("lynx"), None);
    }
}
