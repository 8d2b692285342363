use super::types::{Scenario, ScenarioDocument, ScenarioSet};
use anyhow::{Context, Result};
use std::path::Path;

/// Load scenarios from a file, or from every scenario file under a directory
pub fn load_scenarios(path: &Path) -> Result<ScenarioSet> {
    if !path.is_dir() {
        return parse_scenario_file(path);
    }

    let mut files: Vec<_> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_scenario_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    let mut set = ScenarioSet::default();
    for file in files {
        set.extend(parse_scenario_file(&file)?);
    }
    Ok(set)
}

/// Parse a single YAML or JSON scenario file
pub fn parse_scenario_file(path: &Path) -> Result<ScenarioSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    parse_scenario_content(&content, is_json)
        .with_context(|| format!("Invalid scenario file: {}", path.display()))
}

/// Parse scenario content; JSON is tried with `serde_json` for better errors
pub fn parse_scenario_content(content: &str, is_json: bool) -> Result<ScenarioSet> {
    let doc: ScenarioDocument = if is_json {
        serde_json::from_str(content)?
    } else {
        serde_yaml::from_str(content)?
    };

    let set = ScenarioSet::from(doc);
    for scenario in &set.scenarios {
        validate(scenario)?;
    }
    Ok(set)
}

fn validate(scenario: &Scenario) -> Result<()> {
    if scenario.name.trim().is_empty() {
        anyhow::bail!("Scenario name must not be empty");
    }
    if scenario.steps.is_empty() {
        anyhow::bail!("Scenario '{}' has no steps", scenario.name);
    }
    Ok(())
}

fn is_scenario_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| {
        ext == "yaml" || ext == "yml" || ext == "json"
    })
}
