use super::result::BatchSummary;
use tokio::sync::broadcast;

/// Pipeline stage of a single scenario execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Materialize,
    Runner,
    Correlate,
    Artifacts,
    Cleanup,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Materialize => "writing test script",
            Stage::Runner => "running browser test",
            Stage::Correlate => "reading report",
            Stage::Artifacts => "collecting artifacts",
            Stage::Cleanup => "cleaning up",
        }
    }
}

/// Execution events for real-time updates
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    BatchStarted {
        total: usize,
        target_url: String,
    },
    BatchFinished {
        summary: BatchSummary,
        stopped_early: bool,
    },

    ScenarioStarted {
        scenario: String,
        index: usize,
        total: usize,
    },
    StageStarted {
        scenario: String,
        stage: Stage,
    },
    ScenarioFinished {
        scenario: String,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
    },

    Log {
        scenario: String,
        message: String,
    },
}

/// Event emitter for broadcasting execution events
pub struct EventEmitter {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<ExecutionEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<ExecutionEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                ExecutionEvent::BatchStarted { total, target_url } => {
                    println!(
                        "\n{} Executing {} scenario(s) against {}",
                        "▶".green().bold(),
                        total,
                        target_url.cyan()
                    );
                }

                ExecutionEvent::ScenarioStarted {
                    scenario,
                    index,
                    total,
                } => {
                    println!(
                        "\n  {} [{}/{}] {}",
                        "→".blue(),
                        index + 1,
                        total,
                        scenario.white().bold()
                    );
                }

                ExecutionEvent::StageStarted { stage, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    if stage == Stage::Runner {
                        let pb = ProgressBar::new_spinner();
                        if !interactive {
                            // Piped output: no escape codes
                            pb.set_draw_target(ProgressDrawTarget::hidden());
                        }
                        if let Ok(style) = ProgressStyle::default_spinner()
                            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                            .template("      {spinner} {msg} [{elapsed}]")
                        {
                            pb.set_style(style);
                        }
                        pb.set_message(stage.label().dimmed().to_string());
                        pb.enable_steady_tick(StdDuration::from_millis(100));
                        spinner = Some(pb);
                    } else {
                        println!("      {} {}", "·".dimmed(), stage.label().dimmed());
                    }
                }

                ExecutionEvent::ScenarioFinished {
                    success,
                    duration_ms,
                    error,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    if success {
                        println!("    {} PASSED ({}ms)", "✓".green(), duration_ms);
                    } else {
                        println!("    {} {} ({}ms)", "✗".red(), "FAILED".red().bold(), duration_ms);
                        if let Some(err) = error {
                            for line in err.lines().take(8) {
                                println!("      {}", line.red());
                            }
                        }
                    }
                }

                ExecutionEvent::BatchFinished {
                    summary,
                    stopped_early,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Execution finished", "■".blue().bold());
                    println!(
                        "  {} passed, {} failed, {} total",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.total
                    );
                    println!("  Duration: {}ms", summary.duration_ms);
                    if stopped_early {
                        println!("  {}", "Stopped early, remaining scenarios skipped".yellow());
                    }
                }

                ExecutionEvent::Log { message, .. } => {
                    let line = format!("      {}", message.dimmed());
                    match &spinner {
                        Some(pb) => pb.println(line),
                        None => println!("{}", line),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let (emitter, mut receiver) = EventEmitter::new();
        emitter.emit(ExecutionEvent::Log {
            scenario: "Login".to_string(),
            message: "hello".to_string(),
        });
        match receiver.recv().await.unwrap() {
            ExecutionEvent::Log { scenario, message } => {
                assert_eq!(scenario, "Login");
                assert_eq!(message, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let emitter = EventEmitter::default();
        emitter.emit(ExecutionEvent::Log {
            scenario: "Login".to_string(),
            message: "nobody listens".to_string(),
        });
    }
}
