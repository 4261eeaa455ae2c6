//! Process-wide model registry.
//!
//! Loading a seq2seq checkpoint is expensive, so summarizers are loaded once
//! at process start and handed to callers by reference. The registry is
//! populated during construction and only looked up afterwards; there is no
//! teardown, process exit releases the weights.

use std::collections::HashMap;

use candle_core::Device;
use tracing::info;

use crate::error::{MatomeError, Result};
use crate::summarize::{
    AbstractiveSummarizer, ExtractiveSummarizer, GenerationOptions, SummarizerModel,
};

/// Registry of loaded summarization models.
pub struct ModelRegistry {
    extractive: ExtractiveSummarizer,
    abstractive: HashMap<SummarizerModel, AbstractiveSummarizer>,
    device: Device,
}

impl ModelRegistry {
    /// Create a registry with only the (weight-free) extractive summarizer.
    ///
    /// Device placement is chosen here and fixed for the process lifetime.
    pub fn new(device: Device) -> Result<Self> {
        Ok(Self {
            extractive: ExtractiveSummarizer::new()?,
            abstractive: HashMap::new(),
            device,
        })
    }

    /// Load a checkpoint from the hub and register it. Part of construction;
    /// call before the registry is handed out.
    pub fn with_hub_model(mut self, which: SummarizerModel) -> Result<Self> {
        let summarizer = AbstractiveSummarizer::from_hub(which, &self.device)?;
        self.register(summarizer);
        Ok(self)
    }

    /// Register an already-loaded summarizer.
    pub fn register(&mut self, summarizer: AbstractiveSummarizer) {
        info!(model = %summarizer.which(), "registered abstractive model");
        self.abstractive.insert(summarizer.which(), summarizer);
    }

    /// The shared extractive summarizer.
    pub fn extractive(&self) -> &ExtractiveSummarizer {
        &self.extractive
    }

    /// Models registered at construction time.
    pub fn loaded_models(&self) -> Vec<SummarizerModel> {
        let mut models: Vec<_> = self.abstractive.keys().copied().collect();
        models.sort_by_key(|m| m.as_str());
        models
    }

    /// Run the abstractive summarizer for `which`.
    ///
    /// The mutable borrow only touches the model's internal KV cache; the
    /// set of registered models never changes after construction.
    pub fn summarize_abstractive(
        &mut self,
        which: SummarizerModel,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let summarizer = self.abstractive.get_mut(&which).ok_or_else(|| {
            MatomeError::ModelLoad(format!("model {which} was not loaded at startup"))
        })?;
        summarizer.summarize(text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_reports_no_models() {
        let registry = ModelRegistry::new(Device::Cpu).unwrap();
        assert!(registry.loaded_models().is_empty());
    }

    #[test]
    fn unregistered_model_is_a_load_error() {
        let mut registry = ModelRegistry::new(Device::Cpu).unwrap();
        let err = registry
            .summarize_abstractive(
                SummarizerModel::T5Small,
                "some text",
                &GenerationOptions::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("t5-small"));
    }

    #[test]
    fn extractive_is_always_available() {
        let registry = ModelRegistry::new(Device::Cpu).unwrap();
        let summary = registry
            .extractive()
            .summarize("Only one sentence here.", 1)
            .unwrap();
        assert_eq!(summary, "Only one sentence here.");
    }
}
