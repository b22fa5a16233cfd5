//! Command line front end: records hits and prints the rendered HTML.
//!
//! Run with:
//! ```bash
//! cargo run --features cli -- --assets ./digits --pad-digits 5 /index.html /about.html
//! ```

use clap::Parser;
use hitcounter::glyphs::DirAssets;
use hitcounter::persistence::snapshot::{app_data_dir, JsonFileStore, SNAPSHOT_FILE_NAME};
use hitcounter::persistence::Persister;
use hitcounter::{DisplayConfig, HitCounter, Style};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Record page hits and render them as digit glyphs.
#[derive(Debug, Parser)]
#[command(name = "hitcounter", version)]
struct Args {
    /// Directory containing one subdirectory of digit images per style
    #[arg(long)]
    assets: PathBuf,

    /// Display configuration file (TOML if it ends in `.toml`, directives otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Glyph style, overrides the configuration file
    #[arg(long, value_parser = parse_style)]
    style: Option<Style>,

    /// Zero-pad counts to this many digits, overrides the configuration file
    #[arg(long)]
    pad_digits: Option<usize>,

    /// Directory holding the snapshot file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Minimum seconds between two snapshot writes
    #[arg(long, default_value_t = 30)]
    cooldown: u64,

    /// Keys to record a hit for, in order
    #[arg(required = true)]
    keys: Vec<String>,
}

fn parse_style(s: &str) -> Result<Style, hitcounter::Error> {
    s.parse()
}

fn load_config(args: &Args) -> Result<DisplayConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            if path.extension().is_some_and(|ext| ext == "toml") {
                DisplayConfig::from_toml(&content)?
            } else {
                DisplayConfig::from_directives(&content)?
            }
        }
        None => DisplayConfig::default(),
    };

    if let Some(style) = args.style {
        config.style = style;
    }
    if let Some(pad_digits) = args.pad_digits {
        config.pad_digits = pad_digits;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    let path = args
        .data_dir
        .clone()
        .unwrap_or_else(app_data_dir)
        .join(SNAPSHOT_FILE_NAME);
    tracing::info!(path = %path.display(), "using hit counter snapshot");

    let persister =
        Persister::new(JsonFileStore::new(path)).with_cooldown(Duration::from_secs(args.cooldown));
    let counter = HitCounter::provision_with(config, &DirAssets::new(&args.assets), persister)?;

    for key in &args.keys {
        println!("{}", counter.hit(key)?);
    }

    counter.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "hitcounter failed");
            ExitCode::FAILURE
        }
    }
}
