//! Confluence Replay
//!
//! Replays a JSON-lines observation file through a sensor and prints one
//! report per window on stdout. Logs go to stderr.
//!
//! Usage:
//!   confluence-replay <observations.jsonl|-> [config.json]
//!
//! Without a config argument the file named by `CONFLUENCE_CONFIG` is used,
//! falling back to defaults.

use std::fs::File;
use std::io::{self, BufReader};

use confluence_cli::Replay;
use confluence_sensor::{Sensor, SensorConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn print_usage() {
    eprintln!("Usage: confluence-replay <observations.jsonl|-> [config.json]");
    eprintln!();
    eprintln!("Input lines:");
    eprintln!("  {{\"type\":\"event\",\"timestamp\":..,\"entities\":[..],\"features\":[..]}}");
    eprintln!("  {{\"type\":\"flush\"}}       run a window, print its report");
    eprintln!("  {{\"type\":\"snapshot\"}}    print the committed graph");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CONFLUENCE_CONFIG      config file used when none is given");
    eprintln!("  RUST_LOG               log filter (default: confluence=info)");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "confluence=info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 || args[1] == "-h" || args[1] == "--help" {
        print_usage();
        std::process::exit(2);
    }

    let config = match args.get(2) {
        Some(path) => SensorConfig::from_file(path)?,
        None => SensorConfig::from_env()?,
    };
    let sensor = Sensor::new(config)?;

    let stdout = io::stdout();
    let replay = Replay::new(sensor, stdout.lock());
    let (stats, _) = if args[1] == "-" {
        replay.run(io::stdin().lock())?
    } else {
        replay.run(BufReader::new(File::open(&args[1])?))?
    };

    info!(
        lines = stats.lines,
        events = stats.events,
        skipped = stats.skipped,
        windows = stats.windows,
        aborted = stats.aborted,
        "Replay finished"
    );
    Ok(())
}
