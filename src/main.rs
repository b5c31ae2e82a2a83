//! acl-reorder: Self-optimizing ACL rule ordering
//!
//! Runs the configured traffic simulation against one engine per policy
//! and prints the final reports.
//!
//! # Usage
//!
//! ```bash
//! # Run with the built-in default configuration
//! ./acl-reorder
//!
//! # Run with a custom configuration
//! ./acl-reorder -c /path/to/config.json
//!
//! # Run with environment overrides
//! ACL_REORDER_LOG_LEVEL=debug ACL_REORDER_PACKETS=10000 ./acl-reorder -c config.json
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use acl_reorder::config::{apply_env_overrides, load_config_with_env, Config};
use acl_reorder::feed::simulate;

/// Command-line arguments
struct Args {
    /// Configuration file path (built-in default when absent)
    config_path: Option<PathBuf>,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = None;
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = Some(PathBuf::from(path));
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("acl-reorder v{}", acl_reorder::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r#"acl-reorder v{}

Self-optimizing ACL rule ordering simulator.

USAGE:
    acl-reorder [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: built-in example]
    -g, --generate-config   Write the default configuration to --config and exit
    --check                 Check configuration and exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    ACL_REORDER_LOG_LEVEL   Override log level (trace, debug, info, warn, error)
    ACL_REORDER_PACKETS     Override number of simulated packets per policy
    ACL_REORDER_SEED        Override traffic seed
"#,
        acl_reorder::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("tokio=warn".parse().expect("static directive is valid"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Load the configuration file, or the built-in default with env overrides
fn load(args: &Args) -> Result<Config> {
    match &args.config_path {
        Some(path) => load_config_with_env(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration from {path:?}: {e}")),
        None => {
            let mut config = Config::default_config();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            config.validate()?;
            Ok(config)
        }
    }
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();

    let args = Args::parse();

    if args.generate_config {
        let path = args
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("acl-reorder.json"));
        acl_reorder::config::create_default_config(&path)?;
        println!("Generated default configuration at {path:?}");
        return Ok(());
    }

    let config = load(&args)?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);

    info!("acl-reorder v{}", acl_reorder::VERSION);
    info!(
        rules = config.rules.len(),
        packets = config.simulation.packets,
        seed = config.simulation.seed,
        "Starting simulation"
    );

    let runs = simulate(&config).await?;

    for run in &runs {
        println!("{}", serde_json::to_string_pretty(&run.last)?);
        info!(
            policy = %run.policy,
            initial = run.initial.expected_latency,
            last = run.last.expected_latency,
            rejected = run.feed.rejected,
            swap_rate = run.last.stats.swap_rate(),
            "Expected latency"
        );
    }

    info!(
        "Finished in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
