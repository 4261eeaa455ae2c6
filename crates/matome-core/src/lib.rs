//! # Matome Core
//!
//! The heart of the Matome toolkit. Provides extractive and abstractive text
//! summarization, fixed-vocabulary multi-label encoding, and the model
//! registry shared by the pipelines.
//!
//! ## Quick Start
//!
//! ```rust
//! use matome_core::summarize::ExtractiveSummarizer;
//!
//! let summarizer = ExtractiveSummarizer::new().unwrap();
//! let summary = summarizer
//!     .summarize("The cat sat. The dog ran. Cats and dogs played.", 2)
//!     .unwrap();
//!
//! assert_eq!(summary.split(". ").count(), 2);
//! ```
pub mod error;
pub mod labels;
pub mod registry;
pub mod summarize;

// Re-export primary API
pub use error::{MatomeError, Result};
pub use labels::LabelVocabulary;
pub use registry::ModelRegistry;
pub use summarize::{
    AbstractiveSummarizer, ExtractiveSummarizer, GenerationOptions, SummarizerModel,
};
