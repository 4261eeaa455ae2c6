//! Multi-label classifier training CLI.
//!
//! Trains either the embedding encoder or the tf-idf baseline on a CSV or
//! hosted dataset, evaluates a trained encoder, or just fetches a hosted
//! dataset into the local cache.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use candle_core::Device;
use candle_nn::VarMap;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use matome_core::LabelVocabulary;
use matome_trainer::{
    evaluate_logits, load_csv_dataset, vocabulary_from_examples, EncoderClassifier,
    EncoderConfig, Example, TextBatcher, TfidfClassifier, TfidfVectorizer, TrainConfig,
};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train and evaluate multi-label text classifiers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModelKind {
    /// Trainable embedding encoder with masked mean pooling
    Encoder,
    /// TF-IDF logistic-regression baseline
    Tfidf,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a classifier and save its weights and vocabulary
    Train {
        /// CSV dataset with `text` and `labels` columns
        #[arg(long, conflicts_with = "dataset")]
        csv: Option<PathBuf>,

        /// Hosted dataset identifier (e.g. `dair-ai/emotion`)
        #[arg(long, conflicts_with = "csv")]
        dataset: Option<String>,

        /// File to fetch from the hosted dataset
        #[arg(long, default_value = "train.jsonl")]
        dataset_file: String,

        /// Which model family to train
        #[arg(long, value_enum, default_value_t = ModelKind::Encoder)]
        model: ModelKind,

        /// `tokenizer.json` for the encoder path
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// Output directory for weights, vocabulary, and config
        #[arg(long, short, default_value = "out")]
        output: PathBuf,

        #[arg(long, default_value_t = 3)]
        epochs: usize,

        #[arg(long, default_value_t = 16)]
        batch_size: usize,

        #[arg(long, default_value_t = 1e-3)]
        learning_rate: f64,

        #[arg(long, default_value_t = 128)]
        max_seq_len: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Evaluate a trained encoder on a CSV dataset
    Eval {
        /// CSV dataset with `text` and `labels` columns
        #[arg(long)]
        csv: PathBuf,

        /// Directory produced by `train`
        #[arg(long, short, default_value = "out")]
        model_dir: PathBuf,

        /// `tokenizer.json` matching the trained encoder
        #[arg(long)]
        tokenizer: PathBuf,

        #[arg(long, default_value_t = 128)]
        max_seq_len: usize,
    },

    /// Fetch a hosted dataset file into the local cache
    Fetch {
        /// Hosted dataset identifier
        dataset: String,

        /// File to fetch
        #[arg(long, default_value = "train.jsonl")]
        file: String,
    },
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
    let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);

    match cli.command {
        Commands::Train {
            csv,
            dataset,
            dataset_file,
            model,
            tokenizer,
            output,
            epochs,
            batch_size,
            learning_rate,
            max_seq_len,
            seed,
        } => {
            let examples = load_examples(csv.as_deref(), dataset.as_deref(), &dataset_file)?;
            let vocab = vocabulary_from_examples(&examples);
            if vocab.is_empty() {
                bail!("dataset has no labels");
            }
            info!(
                examples = examples.len(),
                labels = vocab.len(),
                "dataset ready"
            );

            let config = TrainConfig {
                epochs,
                batch_size,
                learning_rate,
                max_seq_len,
                seed,
                ..Default::default()
            };

            std::fs::create_dir_all(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;

            match model {
                ModelKind::Encoder => {
                    train_encoder_command(
                        &examples, &vocab, tokenizer, &output, &config, &device,
                    )?;
                }
                ModelKind::Tfidf => {
                    train_tfidf_command(&examples, &vocab, &output, &config, &device)?;
                }
            }

            std::fs::write(output.join("labels.json"), vocab.to_json()?)?;
            info!(output = %output.display(), "training artifacts saved");
        }

        Commands::Eval {
            csv,
            model_dir,
            tokenizer,
            max_seq_len,
        } => {
            let examples = load_csv_dataset(&csv)?;
            let vocab = LabelVocabulary::from_json(
                &std::fs::read_to_string(model_dir.join("labels.json"))
                    .context("failed to read labels.json")?,
            )?;

            let encoder_config: EncoderConfig = serde_json::from_str(
                &std::fs::read_to_string(model_dir.join("encoder.json"))
                    .context("failed to read encoder.json")?,
            )?;
            let model = EncoderClassifier::load(
                model_dir.join("model.safetensors"),
                &encoder_config,
                &device,
            )?;

            let batcher = TextBatcher::from_file(
                tokenizer.to_str().context("tokenizer path is not UTF-8")?,
                max_seq_len,
                device.clone(),
            )?;

            let indices: Vec<usize> = (0..examples.len()).collect();
            let batch = batcher.encode(&examples, &indices, &vocab)?;
            let logits = model.forward(&batch)?;
            let report = evaluate_logits(&vocab, &logits, &batch.labels)?;
            println!("{report}");
        }

        Commands::Fetch { dataset, file } => {
            let path = matome_trainer::data::fetch_hub_file(&dataset, &file)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_examples(
    csv: Option<&Path>,
    dataset: Option<&str>,
    dataset_file: &str,
) -> Result<Vec<Example>> {
    match (csv, dataset) {
        (Some(path), None) => load_csv_dataset(path),
        (None, Some(id)) => matome_trainer::fetch_hub_dataset(id, dataset_file),
        _ => bail!("provide exactly one of --csv or --dataset"),
    }
}

fn train_encoder_command(
    examples: &[Example],
    vocab: &LabelVocabulary,
    tokenizer: Option<PathBuf>,
    output: &Path,
    config: &TrainConfig,
    device: &Device,
) -> Result<()> {
    let tokenizer = tokenizer.context("--tokenizer is required for the encoder model")?;
    let batcher = TextBatcher::from_file(
        tokenizer.to_str().context("tokenizer path is not UTF-8")?,
        config.max_seq_len,
        device.clone(),
    )?;

    // Vocab size comes from the tokenizer so every id the batcher can emit
    // has an embedding row.
    let encoder_config = EncoderConfig::new(batcher.vocab_size(), vocab.len());
    let varmap = VarMap::new();
    let model = EncoderClassifier::new_trainable(&encoder_config, &varmap, device)?;

    let history =
        matome_trainer::train_encoder(&model, &varmap, &batcher, examples, vocab, config)?;
    for stats in &history {
        println!(
            "epoch {}: mean loss {:.4} over {} batches",
            stats.epoch + 1,
            stats.mean_loss,
            stats.batches
        );
    }

    varmap
        .save(output.join("model.safetensors"))
        .context("failed to save weights")?;
    std::fs::write(
        output.join("encoder.json"),
        serde_json::to_string_pretty(&encoder_config)?,
    )?;
    Ok(())
}

fn train_tfidf_command(
    examples: &[Example],
    vocab: &LabelVocabulary,
    output: &Path,
    config: &TrainConfig,
    device: &Device,
) -> Result<()> {
    let vectorizer = TfidfVectorizer::fit(examples.iter().map(|e| e.text.as_str()));
    let varmap = VarMap::new();
    let model = TfidfClassifier::new_trainable(vectorizer, vocab.len(), &varmap, device)?;

    let history = matome_trainer::train_tfidf(&model, &varmap, examples, vocab, config, device)?;
    for stats in &history {
        println!(
            "epoch {}: mean loss {:.4} over {} batches",
            stats.epoch + 1,
            stats.mean_loss,
            stats.batches
        );
    }

    varmap
        .save(output.join("model.safetensors"))
        .context("failed to save weights")?;
    std::fs::write(
        output.join("vectorizer.json"),
        serde_json::to_string_pretty(&model.vectorizer)?,
    )?;
    Ok(())
}
