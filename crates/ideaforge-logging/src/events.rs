use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const BOX_WIDTH: usize = 68;

/// Stage of an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generating,
    Refining,
    Judging,
    Reporting,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Generating => "CREATOR",
            Stage::Refining => "REFINER",
            Stage::Judging => "JUDGE",
            Stage::Reporting => "WRITER",
        }
    }

    fn short(&self) -> &'static str {
        match self {
            Stage::Generating => "create",
            Stage::Refining => "refine",
            Stage::Judging => "judge",
            Stage::Reporting => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

/// Structured log events for the idea loop. Iterations are zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        prompt: String,
        model: String,
        max_iterations: usize,
    },
    IterationStarted {
        iteration: usize,
    },
    StageStarted {
        iteration: usize,
        stage: Stage,
    },
    StageCompleted {
        iteration: usize,
        stage: Stage,
        duration_secs: f64,
        chars: usize,
    },
    StageFailed {
        iteration: usize,
        stage: Stage,
        error: String,
    },
    IdeaParsed {
        iteration: usize,
        business_name: String,
    },
    IdeaUnparseable {
        iteration: usize,
        error: String,
    },
    RefinementApplied {
        iteration: usize,
        summary: String,
    },
    VerdictReached {
        iteration: usize,
        accepted: bool,
        verdict: String,
    },
    ReportWritten {
        iteration: usize,
        sections_found: usize,
        missing: Vec<String>,
    },
    IterationFinished {
        iteration: usize,
        result: String,
    },
    LoopCompleted {
        iterations: usize,
        business_name: String,
        duration_secs: f64,
    },
    MaxIterationsReached {
        iterations: usize,
    },
    Interrupted {
        iteration: usize,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for loop events. Writes to stderr and optionally to a JSON lines file.
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger that also appends every event to `log_path`
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        let line = match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Self::render_pretty(event),
            LogFormat::Compact => Self::render_compact(event),
        };
        if let Some(line) = line {
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn render_pretty(event: &LogEvent) -> Option<String> {
        let text = match event {
            LogEvent::LoopStarted {
                prompt,
                model,
                max_iterations,
            } => {
                let border = "─".repeat(BOX_WIDTH + 1);
                let title = format!("ideaforge ({} iterations max)", max_iterations);
                format!(
                    "\n{}\n{}  {}\n{}  {} {}\n{}  {} {}\n{}\n",
                    format!("╭{}╮", border).bright_blue(),
                    "│".bright_blue(),
                    Self::truncate_with_padding(&title, BOX_WIDTH - 2, BOX_WIDTH)
                        .bold()
                        .bright_white(),
                    "│".bright_blue(),
                    "Prompt:".dimmed(),
                    Self::truncate_with_padding(prompt, BOX_WIDTH - 11, BOX_WIDTH - 8).dimmed(),
                    "│".bright_blue(),
                    "Model:".dimmed(),
                    Self::truncate_with_padding(model, BOX_WIDTH - 10, BOX_WIDTH - 7).dimmed(),
                    format!("╰{}╯", border).bright_blue(),
                )
            }
            LogEvent::IterationStarted { iteration } => {
                let iter_text = format!("─ Iteration {} ", iteration + 1);
                let padding = "─".repeat(BOX_WIDTH - 1 - iter_text.chars().count());
                format!(
                    "{}{}{}\n",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                )
            }
            LogEvent::StageStarted { stage, .. } => {
                let label = match stage {
                    Stage::Generating => stage.label().bright_cyan().bold(),
                    Stage::Refining => stage.label().bright_cyan().bold(),
                    Stage::Judging => stage.label().bright_magenta().bold(),
                    Stage::Reporting => stage.label().bright_green().bold(),
                };
                format!("  {} {}", "▶".bright_cyan(), label)
            }
            LogEvent::StageCompleted {
                duration_secs,
                chars,
                ..
            } => format!(
                "    {} Done ({:.1}s, {} chars)",
                "✓".bright_green(),
                duration_secs,
                chars
            ),
            LogEvent::StageFailed { stage, error, .. } => format!(
                "    {} {} failed: {}",
                "✗".bright_red(),
                stage,
                error.bright_red()
            ),
            LogEvent::IdeaParsed { business_name, .. } => {
                format!("    {} {}", "Idea:".dimmed(), business_name.bold())
            }
            LogEvent::IdeaUnparseable { error, .. } => format!(
                "    {} Unusable idea: {}",
                "✗".bright_red(),
                error.bright_red()
            ),
            LogEvent::RefinementApplied { summary, .. } => {
                format!("    {} {}", "Refinement:".dimmed(), summary)
            }
            LogEvent::VerdictReached {
                accepted, verdict, ..
            } => {
                if *accepted {
                    format!("    {}", format!("✓ Verdict: {}", verdict).bright_green())
                } else {
                    format!("    {}", format!("→ Verdict: {}", verdict).bright_yellow())
                }
            }
            LogEvent::ReportWritten {
                sections_found,
                missing,
                ..
            } => {
                if missing.is_empty() {
                    format!("    {} Report: {} sections", "✓".bright_green(), sections_found)
                } else {
                    format!(
                        "    {} Report: {} sections, missing {}",
                        "⚠".bright_yellow(),
                        sections_found,
                        missing.join(", ").dimmed()
                    )
                }
            }
            LogEvent::IterationFinished { .. } => format!(
                "\n{}\n",
                format!("└{}┘", "─".repeat(BOX_WIDTH + 1)).bright_blue()
            ),
            // The final outcome is printed by the binary
            LogEvent::LoopCompleted { .. } => return None,
            LogEvent::MaxIterationsReached { iterations } => format!(
                "\n{} Maximum iterations reached ({})",
                "⚠".bright_yellow(),
                iterations
            ),
            LogEvent::Interrupted { iteration } => format!(
                "\n{} Interrupted during iteration {}",
                "⚠".bright_yellow(),
                iteration + 1
            ),
        };
        Some(text)
    }

    fn render_compact(event: &LogEvent) -> Option<String> {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { max_iterations, .. } => {
                format!("loop:start max={}", max_iterations)
            }
            LogEvent::IterationStarted { iteration } => format!("iter:start:{}", iteration + 1),
            LogEvent::StageStarted { iteration, stage } => {
                format!("{}:start:{}", stage, iteration + 1)
            }
            LogEvent::StageCompleted {
                iteration,
                stage,
                duration_secs,
                chars,
            } => format!(
                "{}:done:{} {:.1}s {}c",
                stage,
                iteration + 1,
                duration_secs,
                chars
            ),
            LogEvent::StageFailed {
                iteration,
                stage,
                error,
            } => format!("{}:error:{} {}", stage, iteration + 1, error),
            LogEvent::IdeaParsed {
                iteration,
                business_name,
            } => format!("idea:{} {}", iteration + 1, business_name),
            LogEvent::IdeaUnparseable { iteration, error } => {
                format!("idea:unparseable:{} {}", iteration + 1, error)
            }
            LogEvent::RefinementApplied { iteration, summary } => {
                format!("refine:{} {}", iteration + 1, summary)
            }
            LogEvent::VerdictReached {
                iteration, verdict, ..
            } => format!("verdict:{} {}", iteration + 1, verdict),
            LogEvent::ReportWritten {
                iteration,
                sections_found,
                ..
            } => format!("report:{} sections={}", iteration + 1, sections_found),
            LogEvent::IterationFinished { iteration, result } => {
                format!("iter:done:{} {}", iteration + 1, result)
            }
            LogEvent::LoopCompleted {
                iterations,
                duration_secs,
                ..
            } => format!("loop:done:{} {:.1}s", iterations, duration_secs),
            LogEvent::MaxIterationsReached { iterations } => format!("loop:limit:{}", iterations),
            LogEvent::Interrupted { iteration } => format!("loop:interrupted:{}", iteration + 1),
        };
        Some(format!("[{}] {}", timestamp, msg))
    }

    /// Truncate a string and pad it to an exact width, closing the box
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let first_line = s.lines().next().unwrap_or("");
        let truncated = if first_line.chars().count() > max_len {
            let head: String = first_line.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            first_line.to_string()
        };

        // +1 for the trailing border
        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = LogEvent::StageCompleted {
            iteration: 0,
            stage: Stage::Judging,
            duration_secs: 1.5,
            chars: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stage_completed");
        assert_eq!(json["stage"], "judging");

        let back: LogEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_truncate_with_padding_handles_multibyte() {
        let out = Logger::truncate_with_padding("ééééééééé", 6, 10);
        assert_eq!(out, "ééé...   │");
        assert_eq!(Logger::truncate_with_padding("ok", 6, 5), "ok  │");
    }

    #[test]
    fn test_compact_numbering_is_one_based() {
        let line = Logger::render_compact(&LogEvent::StageStarted {
            iteration: 2,
            stage: Stage::Refining,
        })
        .unwrap();
        assert!(line.ends_with("refine:start:3"));
    }

    #[test]
    fn test_file_logging_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::IterationStarted { iteration: 0 });
        logger.log(&LogEvent::MaxIterationsReached { iterations: 3 });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "iteration_started");
        assert!(lines[1]["timestamp"].is_string());
    }
}
