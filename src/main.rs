use anyhow::{bail, Context, Result};
use clap::Parser;
use jumpsense::{replay, JumpConfig, Strategy};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "jumpsense")]
#[command(about = "Jump counting engine: replays recorded motion or camera input")]
#[command(version)]
#[command(long_about = "Replays a JSON-lines recording of accelerometer samples or camera frame \
descriptors through a detection session backed by simulated devices, and prints a JSON summary \
of the jumps that were counted.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, help = "Path to TOML configuration file (default: jumpsense.toml)")]
    config: Option<String>,

    /// Recording to replay
    #[arg(short, long, value_name = "FILE", help = "JSON-lines recording to replay")]
    input: Option<PathBuf>,

    /// Override the configured strategy (sensor, camera)
    #[arg(short, long, value_name = "STRATEGY", help = "Detection strategy: sensor or camera")]
    strategy: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting jumpsense v{}", env!("CARGO_PKG_VERSION"));
    let loaded = match args.config.as_deref() {
        Some(path) => {
            info!("Configuration file: {}", path);
            JumpConfig::load_from_file(path)
        }
        None => JumpConfig::load(),
    };

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(strategy) = args.strategy.as_deref() {
        config.session.strategy = parse_strategy(strategy)?;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let Some(input) = args.input.as_ref() else {
        bail!("No recording given; pass --input <FILE>");
    };

    let inputs = replay::load_recording(input)
        .with_context(|| format!("Failed to read recording {}", input.display()))?;

    let summary = replay::run(&config, config.session.strategy, &inputs)
        .await
        .map_err(|e| {
            error!("Replay failed: {}", e);
            e
        })?;

    info!(
        "Replay finished: {} jump(s) from {} input(s)",
        summary.count, summary.inputs_read
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn parse_strategy(value: &str) -> Result<Strategy> {
    match value.to_ascii_lowercase().as_str() {
        "sensor" => Ok(Strategy::Sensor),
        "camera" => Ok(Strategy::Camera),
        other => bail!("Unknown strategy '{}', expected sensor or camera", other),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jumpsense={}", log_level)));

    // Logs go to stderr so the JSON summary on stdout stays parseable
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# jumpsense configuration file");
    println!("# Every key can be overridden with JUMPSENSE_<SECTION>__<KEY>, e.g.");
    println!("# JUMPSENSE_SENSOR__RISE_THRESHOLD=0.9");
    println!();
    println!("{}", JumpConfig::default().to_toml()?);
    Ok(())
}
