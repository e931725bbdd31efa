//! Devdrill CLI
//!
//! A command-line tool for running and grading practice exercise code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devdrill::{
    Config, EXAMPLE_CONFIG, ExecutionLimits, Language, RunRequest, Runner, SubmitRequest, Task,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devdrill")]
#[command(about = "Run and grade practice exercise submissions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: devdrill.toml)
        #[arg(short, long, default_value = "devdrill.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program and print its output
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (javascript, python)
        #[arg(short, long, default_value = "javascript")]
        language: String,

        /// Wall time limit in milliseconds
        #[arg(short, long)]
        time_limit_ms: Option<u64>,
    },

    /// Grade a submission against a task
    Submit {
        /// Source file to grade
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Task definition (JSON)
        #[arg(short, long, value_name = "TASK")]
        task: PathBuf,

        /// Language ID (default: javascript)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List supported languages
    Languages,

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Logs go to stderr so program output can be piped
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            time_limit_ms,
        } => run_source(config, &source, &language, time_limit_ms).await,
        Commands::Submit {
            source,
            task,
            language,
        } => submit_source(config, &source, &task, language.as_deref()).await,
        Commands::Languages => {
            list_languages();
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_source(
    config: Config,
    source: &Path,
    language_id: &str,
    time_limit_ms: Option<u64>,
) -> Result<()> {
    let language: Language = language_id.parse().context("unknown language")?;
    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let mut request = RunRequest::new(code, language);
    if let Some(ms) = time_limit_ms {
        request = request.with_limits(ExecutionLimits::unset().with_wall_time_ms(ms));
    }

    info!(%language, "running program");
    let runner = Runner::new(config);
    let response = runner.run(&request).await;

    if response.is_error() {
        eprintln!("{}", response.text());
        std::process::exit(1);
    }

    println!("{}", response.text());
    Ok(())
}

async fn submit_source(
    config: Config,
    source: &Path,
    task_path: &Path,
    language_id: Option<&str>,
) -> Result<()> {
    let language = language_id
        .map(str::parse::<Language>)
        .transpose()
        .context("unknown language")?;

    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;
    let task_json = tokio::fs::read_to_string(task_path)
        .await
        .context("failed to read task file")?;
    let task: Task = serde_json::from_str(&task_json).context("failed to parse task file")?;

    info!(task = %task.id, cases = task.test_cases.len(), "grading submission");
    let runner = Runner::new(config);
    let response = runner
        .submit(&SubmitRequest {
            code,
            task,
            language,
        })
        .await
        .context("submission rejected")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&response.evaluation)
            .context("failed to serialize evaluation")?
    );

    if !response.evaluation.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn list_languages() {
    println!("Available languages:\n");

    for language in Language::ALL {
        let mode = if language.is_gradable() {
            "run, submit"
        } else {
            "run"
        };
        println!("  {:<15} {} ({})", language.id(), language.name(), mode);
    }
}

fn show_config(config: &Config) {
    let limits = &config.limits;
    println!("Execution limits:");
    println!("  Wall time: {:?} ms", limits.wall_time_ms);
    println!("  Loop iterations: {:?}", limits.loop_iteration_limit);
    println!("  Recursion depth: {:?}", limits.recursion_limit);
    println!("  Max code length: {:?}", limits.max_code_length);
    println!("  Max output lines: {:?}", limits.max_output_lines);
    println!();
    println!("Evaluation:");
    println!(
        "  Strict entry point: {}",
        config.evaluation.strict_entry_point
    );
    println!("  Message limit: {}", config.evaluation.message_limit);
    println!(
        "  Description limit: {}",
        config.evaluation.description_limit
    );
    println!();
    println!("Sandbox:");
    println!("  Max concurrent: {}", config.sandbox.max_concurrent);
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
