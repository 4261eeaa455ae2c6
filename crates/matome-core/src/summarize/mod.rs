//! Summarization pipelines: frequency-based extraction and seq2seq generation.

pub mod abstractive;
pub mod extractive;
pub mod stopwords;

pub use abstractive::{AbstractiveSummarizer, GenerationOptions, SummarizerModel};
pub use extractive::ExtractiveSummarizer;
