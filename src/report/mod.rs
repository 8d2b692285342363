pub mod artifacts;
pub mod correlate;
pub mod json;
pub mod junit;
pub mod playwright;
pub mod types;

use anyhow::Result;
use std::path::Path;

/// Re-render a saved `results.json` in another format
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let results = std::fs::read_to_string(results_path)?;
    let run_results: types::RunResults = serde_json::from_str(&results)?;

    match format {
        "json" => json::generate(&run_results, output).await,
        "junit" | "xml" => junit::generate(&run_results, output).await,
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
