mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use humantime_serde::re::humantime;

use ideaforge_agent::{
    ExaConfig, ExaSearch, GeminiClient, GeminiConfig, LlmClient, SearchError, SearchTool,
};
use ideaforge_core::{LoopContext, LoopOutcome, LoopRunner};
use ideaforge_crew::{Role, RoleExecutor, RoleKind};
use ideaforge_logging::{init_tracing, LogFormat, Logger};

use config::{FileConfig, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "ideaforge",
    about = "Generate, refine and judge business ideas with a crew of LLM roles",
    version,
    author
)]
struct Cli {
    /// Seed prompt for idea generation
    #[arg(short, long)]
    prompt: Option<String>,

    /// Working directory holding ideaforge.toml (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Maximum iterations before giving up
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Model used by every role without its own override
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Timeout for a single model call (e.g. "90s", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Disable internet search tools
    #[arg(long)]
    no_search: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append JSON log events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved settings without calling any model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() {
    let code = match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    dotenv::dotenv().ok();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let file_config = FileConfig::load_layered(&working_dir)?;
    let settings = Settings::resolve(
        file_config,
        Overrides {
            prompt: cli.prompt.clone(),
            model: cli.model.clone(),
            temperature: cli.temperature,
            max_iterations: cli.max_iterations,
            timeout: cli.timeout,
            no_search: cli.no_search,
        },
    )
    .context("Invalid configuration")?;

    let mut gemini_config = match &settings.model {
        Some(model) => GeminiConfig::with_model(model.clone()),
        None => GeminiConfig::default(),
    };
    gemini_config = gemini_config.with_timeout(settings.timeout);

    if cli.dry_run {
        print_dry_run(&settings, &gemini_config.model, &working_dir);
        return Ok(0);
    }

    let llm: Arc<dyn LlmClient> =
        Arc::new(GeminiClient::from_env(gemini_config).context("Failed to create LLM client")?);

    let mut executor = RoleExecutor::new(llm, settings.executor_config());
    if let Some(search) = create_search(&settings) {
        executor = executor.with_search(search);
    }

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let mut runner = LoopRunner::new(executor, Arc::new(logger));
    for kind in RoleKind::ALL {
        let role = Role::for_kind(kind).with_model(settings.role_model(kind).map(str::to_string));
        runner = runner.with_role(role);
    }

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Cancelling the current call...");
        interrupt_handle.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let context = LoopContext::new(settings.prompt.clone(), settings.max_iterations);
    let outcome = runner.run(context).await?;

    if cli.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome.to_payload())?);
    } else {
        print_outcome(&outcome);
    }

    Ok(outcome.exit_code())
}

/// Build the search tool, or `None` when disabled or not configured
fn create_search(settings: &Settings) -> Option<Arc<dyn SearchTool>> {
    if !settings.search_enabled {
        return None;
    }

    let config = ExaConfig {
        num_results: settings.search_results,
        ..Default::default()
    };
    match ExaSearch::from_env(config) {
        Ok(search) => Some(Arc::new(search)),
        Err(SearchError::MissingCredential(var)) => {
            eprintln!(
                "{} {} is not set, internet search is disabled",
                "warning:".bright_yellow().bold(),
                var
            );
            None
        }
        Err(e) => {
            eprintln!(
                "{} search unavailable: {}",
                "warning:".bright_yellow().bold(),
                e
            );
            None
        }
    }
}

fn print_dry_run(settings: &Settings, default_model: &str, working_dir: &std::path::Path) {
    println!("=== Dry Run ===");
    println!("Prompt: {}", truncate(&settings.prompt, 100));
    println!("Working dir: {}", working_dir.display());
    println!("Max iterations: {}", settings.max_iterations);
    println!("Temperature: {}", settings.temperature);
    println!("Timeout: {}", humantime::format_duration(settings.timeout));
    println!(
        "Retries: {} attempts, backoff {} to {}",
        settings.retry.max_attempts,
        humantime::format_duration(settings.retry.initial_backoff),
        humantime::format_duration(settings.retry.max_backoff)
    );
    println!(
        "Search: {}",
        if settings.search_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    for kind in RoleKind::ALL {
        println!(
            "{}: {}",
            Role::for_kind(kind).name,
            settings.role_model(kind).unwrap_or(default_model)
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

fn print_outcome(outcome: &LoopOutcome) {
    match outcome {
        LoopOutcome::Success {
            iterations,
            idea,
            report,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== SUCCESS ===");
            eprintln!("Iterations: {}", iterations);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            let missing = report.missing_sections();
            if !missing.is_empty() {
                let titles: Vec<&str> = missing.iter().map(|s| s.title()).collect();
                eprintln!("Report is missing: {}", titles.join(", "));
            }

            println!("{}", "Idea".bold());
            println!("{}", idea.render());
            println!();
            println!("{}", "Report".bold());
            println!("{}", report.text);
        }
        LoopOutcome::Exhausted {
            iterations,
            provider_failures,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== NO VIABLE IDEA ===");
            eprintln!("Gave up after {} iteration(s)", iterations);
            if *provider_failures > 0 {
                eprintln!("{} iteration(s) failed at the provider", provider_failures);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);

            println!("{}", ideaforge_core::NO_VIABLE_IDEA);
        }
        LoopOutcome::Interrupted {
            iterations,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== INTERRUPTED ===");
            eprintln!("User stopped after {} iteration(s)", iterations);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
