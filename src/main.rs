//! wordmake - password candidate wordlist generator and fixer
//!
//! Command-line front end. It initializes:
//! - Logging infrastructure (file rotation + console output)
//! - Tokio runtime (the pipeline itself runs on the blocking pool)
//! - Job configuration loading ([`ConfigManager`])
//! - The [`WorkerScheduler`], which runs the job in the background while this thread
//!   reports progress
//!
//! # Execution Flow
//!
//! 1. Parse arguments, initialize logging -> `logs/wordmake.<date>`
//! 2. Load the YAML job file (`WORDMAKE__*` environment variables override keys)
//! 3. Submit the job and stream its progress events
//! 4. Ctrl-C requests cancellation; the job acknowledges with a `Cancelled` result
//! 5. Exit status: 0 completed, 1 failed, 130 cancelled

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use wordmake::logging::{LoggingOptions, setup_logging};
use wordmake::models::{FixerConfig, GeneratorConfig, JobConfig, JobEvent, JobStatus};
use wordmake::{APP_NAME, ConfigManager, VERSION, WorkerScheduler};

#[derive(Parser, Debug)]
#[command(
    name = "wordmake",
    version,
    about = "Generate and fix password candidate wordlists",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Job file to run
    job: Option<Utf8PathBuf>,

    /// Write the result here instead of the job file's output
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: Utf8PathBuf,

    /// Only log to the log file
    #[arg(long)]
    no_console: bool,

    /// Write the log file as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default job file to start from
    Init {
        /// Where to write the job file
        path: Utf8PathBuf,

        #[arg(long, value_enum, default_value_t = Mode::Generate)]
        mode: Mode,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Generate,
    Fix,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _guard = setup_logging(&LoggingOptions {
        log_dir: cli.log_dir.clone(),
        debug: cli.debug,
        console: !cli.no_console,
        json: cli.json_logs,
        ..LoggingOptions::default()
    })?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let config_manager = ConfigManager::new();

    if let Some(Command::Init { path, mode }) = &cli.command {
        let job = template(*mode);
        config_manager.write_template(path, &job)?;
        println!("Wrote {} job template to {}", job.mode_name(), path);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(job_path) = &cli.job else {
        anyhow::bail!("No job file given; run `wordmake init job.yaml` to create one");
    };

    let mut job = config_manager.load_job(job_path)?;
    if let Some(output) = &cli.output {
        job.set_output(output.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("wordmake-worker")
        .build()?;

    let status = runtime.block_on(run(job))?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    Ok(match status {
        JobStatus::Completed => ExitCode::SUCCESS,
        JobStatus::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    })
}

async fn run(job: JobConfig) -> Result<JobStatus> {
    let scheduler = WorkerScheduler::new(tokio::runtime::Handle::current());
    let mut handle = scheduler.submit(&job)?;

    let cancel = handle.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received - cancelling job");
            cancel.cancel();
        }
    });

    let mut last_percent = None;
    while let Some(event) = handle.next_event().await {
        match event {
            JobEvent::Progress(progress) => {
                let percent = progress.percent();
                if last_percent != Some((progress.stage, percent)) {
                    tracing::info!(
                        "[{}] {}/{} ({}%)",
                        progress.stage,
                        progress.processed,
                        progress.total,
                        percent
                    );
                    last_percent = Some((progress.stage, percent));
                }
            }
            JobEvent::Finished(terminal) => {
                match terminal.status {
                    JobStatus::Completed => {
                        println!("Wrote {} candidates to {}", terminal.count, job.output());
                    }
                    JobStatus::Cancelled => {
                        println!("Cancelled after {} of {}", terminal.count, terminal.total);
                        if terminal.partial_output {
                            println!("Partial output written to {}", job.output());
                        }
                    }
                    _ => {
                        if let Some(error) = &terminal.error {
                            eprintln!("Failed during {}: {}", error.stage, error.message);
                            if error.partial_output {
                                eprintln!("{} may be incomplete", job.output());
                            }
                        }
                    }
                }
                return Ok(terminal.status);
            }
        }
    }

    anyhow::bail!("Job ended without reporting a result")
}

/// Default job written by `wordmake init`.
fn template(mode: Mode) -> JobConfig {
    let sources = vec![Utf8PathBuf::from("words.txt")];
    match mode {
        Mode::Generate => JobConfig::Generate(GeneratorConfig {
            sources,
            pattern: Some("Word-Digit(2)".to_string()),
            ..GeneratorConfig::default()
        }),
        Mode::Fix => JobConfig::Fix(FixerConfig {
            sources,
            min_len: 8,
            require_lower: true,
            require_digit: true,
            ..FixerConfig::default()
        }),
    }
}
