//! batchpool CLI Entry Point
//!
//! Runs a YAML batch of commands with a concurrency cap and retry budget.
//!
//! # Usage
//!
//! ```bash
//! # Run a batch
//! batchpool batch.yaml
//!
//! # Override the concurrency cap
//! batchpool batch.yaml --parallel 8
//!
//! # Size the cap to the machine
//! batchpool batch.yaml --parallel auto
//!
//! # Preview commands without executing
//! batchpool batch.yaml --dry-run
//! ```

use std::env;
use std::process::ExitCode;

use log::info;

use batchpool::queue::CommandQueue;
use batchpool::{load_batch, APP_NAME, MAX_CONCURRENCY, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    batch_path: String,
    parallel: Option<usize>,
    retries: Option<u32>,
    shell: bool,
    no_capture: bool,
    dry_run: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_path: String::new(),
            parallel: None,
            retries: None,
            shell: false,
            no_capture: false,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Bounded-Concurrency Batch Executor");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: batchpool [OPTIONS] <BATCH_FILE>");
    println!();
    println!("Arguments:");
    println!("  <BATCH_FILE>        Path to batch YAML file");
    println!();
    println!("Options:");
    println!("  --parallel N|auto   Concurrency cap, 1 to {} ('auto' sizes to the machine)", MAX_CONCURRENCY);
    println!("  --retries N         Retry budget per command, 0 to 30");
    println!("  --shell             Run commands through the platform shell");
    println!("  --no-capture        Discard command output instead of capturing it");
    println!("  --dry-run           Preview commands without execution");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  batchpool batch.yaml");
    println!("  batchpool batch.yaml --parallel auto --retries 2");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => {
                config.dry_run = true;
            }
            "--shell" => {
                config.shell = true;
            }
            "--no-capture" => {
                config.no_capture = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--parallel" => {
                i += 1;
                if i >= args.len() {
                    return Err("--parallel requires a number or 'auto'".to_string());
                }
                config.parallel = Some(if args[i] == "auto" {
                    num_cpus::get().min(MAX_CONCURRENCY)
                } else {
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid parallel value: {}", args[i]))?
                });
            }
            "--retries" => {
                i += 1;
                if i >= args.len() {
                    return Err("--retries requires a number argument".to_string());
                }
                config.retries = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid retries value: {}", args[i]))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.batch_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if config.batch_path.is_empty() {
        return Err("Missing batch file argument".to_string());
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    // Load batch and apply CLI overrides
    let mut batch = load_batch(&config.batch_path)?;

    if let Some(parallel) = config.parallel {
        batch.concurrency = parallel;
    }
    if let Some(retries) = config.retries {
        batch.retries = retries;
    }
    if config.shell {
        batch.shell = true;
    }
    if config.no_capture {
        batch.capture_output = false;
    }

    info!(
        "Batch: {} command(s), concurrency {}, retries {}",
        batch.commands.len(),
        batch.concurrency,
        batch.retries
    );

    if config.dry_run {
        println!();
        for argv in &batch.commands {
            println!("[DRY RUN] Command: {}", argv.join(" "));
        }
        println!();
        info!("Dry run complete - no commands executed");
        return Ok(());
    }

    // Queue and execute the batch
    let mut queue = CommandQueue::new();
    queue.add_commands(batch.commands.clone())?;
    queue.run_with(batch.run_options())?;

    println!();
    println!("Batch completed successfully");

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
