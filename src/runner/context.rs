use crate::error::ExecutionError;
use std::path::{Path, PathBuf};

const MAX_NAME_LEN: usize = 48;
const ARTIFACTS_DIR: &str = "test-results";
const REPORT_FILE: &str = "report.json";

/// Disposable working directory owned by exactly one scenario execution.
///
/// The directory tree is removed by [`ExecutionContext::close`]. If the value
/// is dropped without being closed (panic, cancelled future) the tree is
/// removed on drop instead.
#[derive(Debug)]
pub struct ExecutionContext {
    id: String,
    root: PathBuf,
    artifacts_dir: PathBuf,
    report_path: PathBuf,
    closed: bool,
}

impl ExecutionContext {
    /// Create `<runs_dir>/<id>` and its artifacts directory
    pub fn open(runs_dir: &Path, scenario_name: &str) -> Result<Self, ExecutionError> {
        std::fs::create_dir_all(runs_dir).map_err(|source| ExecutionError::ContextCreation {
            path: runs_dir.to_path_buf(),
            source,
        })?;

        let id = context_id(scenario_name);
        let root = runs_dir.join(&id);

        // create_dir fails on an existing path, so two runs never share a root
        std::fs::create_dir(&root).map_err(|source| ExecutionError::ContextCreation {
            path: root.clone(),
            source,
        })?;

        let artifacts_dir = root.join(ARTIFACTS_DIR);
        if let Err(source) = std::fs::create_dir(&artifacts_dir) {
            let _ = std::fs::remove_dir_all(&root);
            return Err(ExecutionError::ContextCreation {
                path: artifacts_dir,
                source,
            });
        }

        log::debug!("Opened execution context {}", root.display());

        Ok(Self {
            id,
            report_path: root.join(REPORT_FILE),
            root,
            artifacts_dir,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Remove the whole context tree.
    ///
    /// The error is returned for logging only; callers must not turn it into a
    /// run failure.
    pub fn close(mut self) -> std::io::Result<()> {
        self.closed = true;
        remove_tree(&self.root)
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = remove_tree(&self.root) {
            log::warn!(
                "Failed to remove execution context {}: {}",
                self.root.display(),
                e
            );
        }
    }
}

fn remove_tree(root: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(root) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Path-safe, collision-free identifier for one run of `scenario_name`
pub fn context_id(scenario_name: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
    let unique = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        sanitize_name(scenario_name),
        timestamp,
        &unique[..8]
    )
}

/// Replace every non-alphanumeric character with `_` and cap the length
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect();

    if sanitized.is_empty() {
        "scenario".to_string()
    } else {
        sanitized
    }
}
