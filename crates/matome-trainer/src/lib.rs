//! # Matome Trainer
//!
//! Training and evaluation for multi-label text classifiers built on
//! [candle](https://github.com/huggingface/candle).
//!
//! The crate covers the full loop: dataset ingestion (local CSV or a hosted
//! dataset fetched by identifier), label binarization against a fixed
//! vocabulary, shuffled mini-batch training with AdamW and a linear
//! warmup/decay schedule, and thresholded sigmoid evaluation with a
//! per-label precision/recall/F1 report.
//!
//! Two model families share the same loop: a tf-idf logistic-regression
//! baseline and a trainable embedding encoder with masked mean pooling.

pub mod batch;
pub mod data;
pub mod eval;
pub mod model;
pub mod trainer;

pub use batch::{shuffled_batches, EncodedBatch, TextBatcher};
pub use data::{fetch_hub_dataset, load_csv_dataset, vocabulary_from_examples, Example};
pub use eval::{evaluate_logits, ClassificationReport, LabelMetrics, DECISION_THRESHOLD};
pub use model::{EncoderClassifier, EncoderConfig, TfidfClassifier, TfidfVectorizer};
pub use trainer::{run_epochs, train_encoder, train_tfidf, EpochStats, TrainConfig};
