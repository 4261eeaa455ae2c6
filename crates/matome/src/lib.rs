//! # Matome
//!
//! Umbrella crate re-exporting the summarization core and the classifier
//! training pipeline under one name.

pub use matome_core as core;
pub use matome_trainer as trainer;

pub use matome_core::{
    AbstractiveSummarizer, ExtractiveSummarizer, GenerationOptions, LabelVocabulary, MatomeError,
    ModelRegistry, SummarizerModel,
};
