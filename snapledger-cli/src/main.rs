use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use snapledger_ingest::{Inference, Pipeline, RecordExtractor, TextExtractor, reply_text};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod config;
#[cfg(feature = "gsheets")]
mod google_sheets;
mod llm;
mod logging;
mod ocr;
mod sink;
mod state;
mod telegram;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "snapledger",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SNAPLEDGER_BUILD_SHA"), ")"),
    about = "Receipt photos in, spreadsheet rows out"
)]
struct Cli {
    /// Config file (default: ~/.snapledger/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Telegram bot (long polling)
    Run,

    /// Run the full pipeline on a local image and print the summary
    Extract {
        image: PathBuf,

        /// Extract only; don't write to the sink
        #[arg(long)]
        dry_run: bool,
    },

    /// Structure OCR text (from a file or stdin) into records and print them as JSON
    Parse {
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.snapledger/config.toml
    Init,
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the default config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_json);

    match cli.command {
        Command::Run => {
            let cfg = Arc::new(config::load_config(cli.config.as_deref())?);
            cfg.validate_for_bot()?;
            let pipeline = build_pipeline(&cfg, false).await?;
            telegram::run_bot(cfg, Arc::new(pipeline)).await?;
        }

        Command::Extract { image, dry_run } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            extract_image(&cfg, &image, dry_run).await?;
        }

        Command::Parse { file } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            parse_text(&cfg, file.as_deref()).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&cfg.redacted())?);
            }
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}

fn build_inference(cfg: &Config) -> Result<Arc<dyn Inference>> {
    cfg.validate_extraction()?;
    Ok(Arc::new(llm::HttpInference::new(&cfg.llm)?))
}

async fn build_pipeline(cfg: &Config, dry_run: bool) -> Result<Pipeline> {
    let ocr: Arc<dyn TextExtractor> = Arc::new(ocr::TesseractOcr::new(&cfg.ocr)?);
    let extractor = RecordExtractor::new(build_inference(cfg)?);

    if dry_run {
        return Ok(Pipeline::dry_run(ocr, extractor));
    }
    let sink = sink::build_sink(cfg).await?;
    info!(
        sink = sink.name(),
        provider = ?cfg.llm.provider,
        model = %cfg.llm.model,
        "pipeline ready"
    );
    Ok(Pipeline::new(ocr, extractor, sink))
}

async fn extract_image(cfg: &Config, image: &Path, dry_run: bool) -> Result<()> {
    if !image.exists() {
        bail!("image not found: {}", image.display());
    }
    let pipeline = build_pipeline(cfg, dry_run).await?;

    let outcome = pipeline.process_image(image).await;
    println!("{}", reply_text(&outcome));

    match outcome {
        Ok(d) if d.saved => println!("\nSaved {} row(s).", d.records.len()),
        Ok(_) => {}
        Err(e) => return Err(e).with_context(|| format!("processing {}", image.display())),
    }
    Ok(())
}

async fn parse_text(cfg: &Config, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s).context("read stdin")?;
            s
        }
    };
    if text.trim().is_empty() {
        bail!("no text to parse");
    }

    let extractor = RecordExtractor::new(build_inference(cfg)?);
    let records = extractor.extract_records(&text).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
