// LogSlicer - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading (CLI flags override it)
// 3. Logging initialisation (debug mode support)
// 4. Running the job on a worker thread while reporting elapsed time

use clap::Parser;
use logslicer::app::job::{JobManager, JobProgress};
use logslicer::app::pipeline::{self, Mode, RunOptions, RunRequest};
use logslicer::core::model::EmptyArchivePolicy;
use logslicer::platform::config::{self, PlatformPaths};
use logslicer::util;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

/// LogSlicer - split application-server logs into one file per request URL.
///
/// Every request line and the stack trace that follows an `*ERROR*` entry
/// go to a file named after the requested path. The run finishes with an
/// audit of lines that landed nowhere, a line/character checksum and a zip
/// archive of everything produced.
#[derive(Parser, Debug)]
#[command(name = "logslicer", version, about)]
struct Cli {
    /// Log file to process.
    input: PathBuf,

    /// Directory receiving the results (defaults to the input's directory).
    #[arg(short = 'o', long = "save-dir")]
    save_dir: Option<PathBuf>,

    /// Write only the blocks containing this parameter to a single
    /// `filtered_<param>.log`, skipping split, audit and archive.
    #[arg(short = 'f', long = "filter", conflicts_with = "concat")]
    filter: Option<String>,

    /// Comma-separated parameters whose blocks are collected into one file
    /// each instead of being split per URL. May be repeated.
    #[arg(short = 'c', long = "concat")]
    concat: Vec<String>,

    /// With --filter: also remove the filtered lines from the input file.
    #[arg(long = "in-place", requires = "filter")]
    in_place: bool,

    /// Keep `at ...` stack-frame lines even outside an `*ERROR*` capture.
    #[arg(long = "lenient-stack-frames")]
    lenient_stack_frames: bool,

    /// Lines starting with `Error` open a capture.
    #[arg(long = "error-prefix-capture")]
    error_prefix_capture: bool,

    /// Do not build a zip archive.
    #[arg(long = "no-archive")]
    no_archive: bool,

    /// Delete the working directory once the archive is written.
    #[arg(long = "cleanup", conflicts_with = "no_archive")]
    cleanup: bool,

    /// Write an empty archive instead of reporting that nothing was found.
    #[arg(long = "empty-archive")]
    empty_archive: bool,

    /// Lines between progress updates.
    #[arg(long = "progress-interval", value_parser = clap::value_parser!(u64).range(
        util::constants::MIN_PROGRESS_INTERVAL_LINES..=util::constants::MAX_PROGRESS_INTERVAL_LINES
    ))]
    progress_interval: Option<u64>,

    /// Print the run report as JSON instead of text.
    #[arg(long = "json")]
    json: bool,

    /// Configuration file (defaults to the platform config directory).
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        match &self.filter {
            Some(param) => Mode::Filter {
                param: param.clone(),
                in_place: self.in_place,
            },
            None => Mode::Split {
                concat_params: pipeline::parse_concat_params(&self.concat.join(",")),
            },
        }
    }

    /// Apply command-line overrides on top of the file configuration.
    fn apply_to(&self, app_config: &mut config::AppConfig) {
        if self.lenient_stack_frames {
            app_config.policy.lenient_stack_frames = true;
        }
        if self.error_prefix_capture {
            app_config.policy.error_prefix_opens_capture = true;
        }
        if self.no_archive {
            app_config.archive = false;
        }
        if self.cleanup {
            app_config.keep_work_dir = false;
        }
        if self.empty_archive {
            app_config.empty_archive = EmptyArchivePolicy::Create;
        }
        if let Some(interval) = self.progress_interval {
            app_config.progress_interval_lines = interval;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Config first so its [logging] level can seed the subscriber.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file);
    let (mut app_config, config_warnings) = config::load_config(&config_path);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "LogSlicer starting"
    );

    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
        eprintln!("Warning: {warning}");
    }

    cli.apply_to(&mut app_config);

    let mode = cli.mode();
    let request = match cli.save_dir.clone() {
        Some(save_dir) => RunRequest {
            input: cli.input.clone(),
            save_dir,
            mode,
        },
        None => RunRequest::beside_input(cli.input.clone(), mode),
    };

    let mut manager = JobManager::new();
    manager.start(request, RunOptions::from_config(&app_config));

    // Ctrl-C asks the worker to stop so open outputs are flushed and closed.
    if let Some(flag) = manager.cancel_handle() {
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "Could not install Ctrl-C handler");
        }
    }

    let started = Instant::now();
    let tick = Duration::from_millis(util::constants::ELAPSED_REPORT_INTERVAL_MS);

    loop {
        match manager.wait_progress(tick) {
            Ok(JobProgress::Started { input }) => {
                eprintln!("Processing {} ...", input.display());
            }
            Ok(JobProgress::Phase(phase)) => eprintln!("{phase}..."),
            Ok(JobProgress::Lines { lines_read }) => {
                tracing::debug!(lines_read, "Progress");
            }
            Ok(JobProgress::Finished(report)) => {
                if cli.json {
                    match report.to_json() {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error: could not serialise report: {e}");
                            std::process::exit(1);
                        }
                    }
                } else {
                    print!("{}", report.message());
                }
                return;
            }
            Ok(JobProgress::Cancelled { produced }) => {
                eprintln!(
                    "Cancelled after {}; {} file(s) were written.",
                    pipeline::format_elapsed(started.elapsed()),
                    produced.len()
                );
                std::process::exit(2);
            }
            Ok(JobProgress::Failed { error }) => {
                eprintln!("Error: {error}");
                std::process::exit(1);
            }
            Err(RecvTimeoutError::Timeout) => {
                eprintln!(
                    "Processing... elapsed: {}",
                    pipeline::format_elapsed(started.elapsed())
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("Worker exited without a result");
                eprintln!("Error: processing stopped unexpectedly");
                std::process::exit(1);
            }
        }
    }
}
