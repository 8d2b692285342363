use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lumi_scenario::utils::binary_resolver::resolve_runner;
use lumi_scenario::utils::config::{BrowserType, RunSettings, RunnerSelection};
use lumi_scenario::{report, runner};

#[derive(Parser)]
#[command(name = "lumi-scenario")]
#[command(author = "NL Team")]
#[command(version)]
#[command(about = "Execute generated browser test scenarios and collect structured results", long_about = None)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenario file(s) or directory, one scenario at a time
    Run {
        /// Path to scenario file or directory
        path: PathBuf,

        /// Target application URL (overrides `url` in the scenario file)
        #[arg(short, long)]
        url: Option<String>,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Write results.json and junit.xml to the output directory
        #[arg(long, default_value = "false")]
        report: bool,

        /// Explicit runner executable (skips auto-detection)
        #[arg(long)]
        runner: Option<PathBuf>,

        /// Base directory for per-run execution contexts
        #[arg(long)]
        runs_dir: Option<PathBuf>,

        /// Keep video/trace of failed runs in this directory
        #[arg(long)]
        artifact_store: Option<PathBuf>,

        /// Wall-clock limit for each runner invocation
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Browser engine (chromium, firefox, webkit)
        #[arg(short, long)]
        browser: Option<String>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,
    },

    /// Show which test runner would be used
    Runner,

    /// Convert a saved results.json
    Report {
        /// Path to results JSON
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => RunSettings::from_file(path)?,
        None => RunSettings::default(),
    }
    .with_env_overrides();

    match cli.command {
        Commands::Run {
            path,
            url,
            output,
            report,
            runner: runner_program,
            runs_dir,
            artifact_store,
            timeout_secs,
            browser,
            headed,
        } => {
            let mut settings = settings;
            if let Some(program) = runner_program {
                settings.runner = RunnerSelection::Command {
                    program,
                    args: Vec::new(),
                };
            }
            if let Some(dir) = runs_dir {
                settings.runs_dir = dir;
            }
            if artifact_store.is_some() {
                settings.artifact_store = artifact_store;
            }
            if let Some(secs) = timeout_secs {
                settings.set_process_timeout_secs(secs);
            }
            if let Some(name) = browser {
                settings.browser = BrowserType::parse(&name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown browser: {}", name))?;
            }
            if headed {
                settings.headless = false;
            }

            println!(
                "{} Running scenarios from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Browser: {}", settings.browser.as_str().cyan());
            println!(
                "  Timeout: {}",
                format!("{}s", settings.process_timeout_ms / 1000).cyan()
            );
            if report {
                println!("  Reports: {}", output.display().to_string().cyan());
            }

            // Ctrl+C lets the current scenario finish, then stops the batch
            let stop = Arc::new(AtomicBool::new(false));
            let stop_handler = stop.clone();
            ctrlc::set_handler(move || {
                println!(
                    "\n{} Stopping after the current scenario...",
                    "⏹️ ".yellow()
                );
                stop_handler.store(true, Ordering::SeqCst);
            })?;

            let results = runner::run_scenarios(
                &path,
                url.as_deref(),
                settings,
                &output,
                report,
                &stop,
            )
            .await?;

            if !results.all_passed() {
                std::process::exit(1);
            }
        }

        Commands::Runner => match resolve_runner(&settings.runner, &settings.workspace_dir) {
            Ok(runner) => {
                println!("{} Test runner: {}", "✓".green(), runner.to_string().cyan());
            }
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                std::process::exit(1);
            }
        },

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
