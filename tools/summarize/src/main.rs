//! Summarization CLI.
//!
//! Summarizes text from an argument, a file, or stdin with one of three
//! methods: the extractive frequency scorer or one of the two seq2seq
//! checkpoints. Models are loaded into a registry once at startup, before
//! any input is processed.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use candle_core::Device;
use clap::{Parser, ValueEnum};
use tracing::info;

use matome_core::{GenerationOptions, ModelRegistry, SummarizerModel};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Method {
    /// Word-frequency sentence scoring, no model weights
    Extractive,
    /// T5-small seq2seq generation
    #[value(name = "t5-small")]
    T5Small,
    /// FLAN-T5-small seq2seq generation
    #[value(name = "flan-t5-small")]
    FlanT5Small,
}

impl Method {
    fn model(self) -> Option<SummarizerModel> {
        match self {
            Method::Extractive => None,
            Method::T5Small => Some(SummarizerModel::T5Small),
            Method::FlanT5Small => Some(SummarizerModel::FlanT5Small),
        }
    }
}

#[derive(Parser)]
#[command(name = "summarize")]
#[command(about = "Summarize text with extractive or seq2seq methods")]
#[command(version)]
struct Cli {
    /// Text to summarize; omit to read --file or stdin
    text: Option<String>,

    /// Read the input text from a file
    #[arg(long, short, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Summarization method
    #[arg(long, short, value_enum, default_value_t = Method::Extractive)]
    method: Method,

    /// Sentences to keep (extractive only)
    #[arg(long, short = 'n', default_value_t = 3)]
    sentences: usize,

    /// Maximum generated tokens (seq2seq only)
    #[arg(long, default_value_t = 150)]
    max_length: usize,

    /// Minimum generated tokens before EOS is allowed (seq2seq only)
    #[arg(long, default_value_t = 40)]
    min_length: usize,

    /// Load model weights from a local directory instead of the hub
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let text = read_input(&cli)?;
    if text.trim().is_empty() {
        bail!("input text is empty");
    }

    let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);

    // The registry is built once, loading exactly the checkpoint the chosen
    // method needs.
    let mut registry = ModelRegistry::new(device.clone())?;
    if let Some(which) = cli.method.model() {
        registry = match &cli.model_dir {
            Some(dir) => {
                let summarizer =
                    matome_core::AbstractiveSummarizer::from_dir(which, dir, &device)?;
                registry.register(summarizer);
                registry
            }
            None => registry.with_hub_model(which)?,
        };
        info!(models = ?registry.loaded_models(), "registry ready");
    }

    let summary = match cli.method.model() {
        None => registry.extractive().summarize(&text, cli.sentences)?,
        Some(which) => {
            let options = GenerationOptions {
                max_length: cli.max_length,
                min_length: cli.min_length,
            };
            registry.summarize_abstractive(which, &text, &options)?
        }
    };

    println!("{summary}");
    Ok(())
}

fn read_input(cli: &Cli) -> Result<String> {
    if let Some(text) = &cli.text {
        return Ok(text.clone());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}
