use anyhow::Context;
use bridge_envelope_cli::commands::write_inspection;
use bridge_envelope_cli::{
    decode_stream, encode_stream, inspect, ContentMode, OnError, StreamSummary, ToolConfig,
};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bridge-envelope", version, about = "Decode, encode and inspect bridge envelopes")]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    on_error: Option<OnError>,

    #[arg(long, value_enum)]
    content: Option<ContentMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Base64 envelopes in, JSON records out.
    Decode { input: Option<PathBuf> },
    /// JSON records in, base64 envelopes out.
    Encode { input: Option<PathBuf> },
    /// Print the field layout of one base64 envelope.
    Inspect { payload: String },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("bridge-envelope error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ToolConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ToolConfig::default(),
    }
    .with_overrides(cli.on_error, cli.content);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();
    log::info!("on_error={:?} content={:?}", config.on_error, config.content);

    let stdout = io::stdout();
    match cli.command {
        Command::Decode { input } => {
            let summary =
                decode_stream(open_input(input)?, stdout.lock(), config.content, config.on_error)?;
            report(summary);
        }
        Command::Encode { input } => {
            let summary =
                encode_stream(open_input(input)?, stdout.lock(), config.content, config.on_error)?;
            report(summary);
        }
        Command::Inspect { payload } => {
            let inspection = inspect(&payload)?;
            write_inspection(stdout.lock(), &inspection)?;
            if let Some(err) = inspection.error {
                return Err(err.into());
            }
        }
    }
    Ok(())
}

fn open_input(path: Option<PathBuf>) -> anyhow::Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn report(summary: StreamSummary) {
    if summary.skipped > 0 {
        log::warn!("{} records processed, {} skipped", summary.processed, summary.skipped);
    } else {
        log::info!("{} records processed", summary.processed);
    }
}
