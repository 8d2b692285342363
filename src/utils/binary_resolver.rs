use crate::error::ExecutionError;
use crate::utils::config::RunnerSelection;
use std::fmt;
use std::path::{Path, PathBuf};

const RUNNER_NAME: &str = "playwright";
const RUNNER_PACKAGE: &str = "playwright";

/// A resolved way of starting the test runner.
///
/// Every variant accepts the same trailing arguments, so callers only ever
/// append `test --config ...` to whatever [`RunnerCommand::command`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCommand {
    /// Binary installed in the workspace or on PATH
    Local(PathBuf),
    /// Package runner indirection, e.g. `npx playwright`
    PackageRunner { program: PathBuf, package: String },
    /// User supplied program and leading arguments
    Custom { program: PathBuf, args: Vec<String> },
}

impl RunnerCommand {
    pub fn program(&self) -> &Path {
        match self {
            RunnerCommand::Local(path) => path.as_path(),
            RunnerCommand::PackageRunner { program, .. } => program.as_path(),
            RunnerCommand::Custom { program, .. } => program.as_path(),
        }
    }

    fn leading_args(&self) -> Vec<String> {
        match self {
            RunnerCommand::Local(_) => Vec::new(),
            RunnerCommand::PackageRunner { package, .. } => {
                vec!["--yes".to_string(), package.clone()]
            }
            RunnerCommand::Custom { args, .. } => args.clone(),
        }
    }

    /// Build a command with the strategy specific prefix already applied
    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(self.program());
        cmd.args(self.leading_args());
        cmd
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerCommand::Local(path) => write!(f, "{}", path.display()),
            RunnerCommand::PackageRunner { program, package } => {
                write!(f, "{} --yes {}", program.display(), package)
            }
            RunnerCommand::Custom { program, args } => {
                write!(f, "{}", program.display())?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

/// Resolve the runner for one invocation.
///
/// Order for [`RunnerSelection::Auto`]: `node_modules/.bin` of the workspace
/// or any ancestor, then PATH, then the `npx` package runner.
pub fn resolve_runner(
    selection: &RunnerSelection,
    workspace_dir: &Path,
) -> Result<RunnerCommand, ExecutionError> {
    if let RunnerSelection::Command { program, args } = selection {
        return Ok(RunnerCommand::Custom {
            program: program.clone(),
            args: args.clone(),
        });
    }

    let mut checked_paths = Vec::new();

    for dir in workspace_dir.ancestors() {
        let candidate = dir
            .join("node_modules")
            .join(".bin")
            .join(platform_binary(RUNNER_NAME));
        checked_paths.push(format!("Workspace: {}", candidate.display()));
        if candidate.is_file() {
            return Ok(RunnerCommand::Local(candidate));
        }
    }

    checked_paths.push(format!("PATH: {}", RUNNER_NAME));
    if let Ok(path) = which::which(RUNNER_NAME) {
        return Ok(RunnerCommand::Local(path));
    }

    checked_paths.push("PATH: npx".to_string());
    if let Ok(npx) = which::which(platform_binary("npx")) {
        return Ok(RunnerCommand::PackageRunner {
            program: npx,
            package: RUNNER_PACKAGE.to_string(),
        });
    }

    Err(ExecutionError::RunnerNotFound {
        checked: checked_paths,
    })
}

fn platform_binary(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.cmd", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_command_wins() {
        let selection = RunnerSelection::Command {
            program: PathBuf::from("sh"),
            args: vec!["fake-runner.sh".to_string()],
        };
        let runner = resolve_runner(&selection, Path::new("/nonexistent")).unwrap();
        assert_eq!(
            runner,
            RunnerCommand::Custom {
                program: PathBuf::from("sh"),
                args: vec!["fake-runner.sh".to_string()],
            }
        );
        assert_eq!(runner.to_string(), "sh fake-runner.sh");
    }

    #[test]
    fn test_prefers_workspace_install() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("node_modules").join(".bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let local = bin_dir.join(platform_binary(RUNNER_NAME));
        std::fs::write(&local, "").unwrap();

        let nested = dir.path().join("packages").join("app");
        std::fs::create_dir_all(&nested).unwrap();

        let runner = resolve_runner(&RunnerSelection::Auto, &nested).unwrap();
        assert_eq!(runner, RunnerCommand::Local(local));
    }

    #[test]
    fn test_package_runner_prefix() {
        let runner = RunnerCommand::PackageRunner {
            program: PathBuf::from("npx"),
            package: "playwright".to_string(),
        };
        assert_eq!(runner.leading_args(), vec!["--yes", "playwright"]);
        assert_eq!(runner.to_string(), "npx --yes playwright");
    }
}
