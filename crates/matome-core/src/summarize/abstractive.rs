//! # Seq2seq abstractive summarizer
//!
//! Wraps a pretrained T5-family conditional-generation model behind a uniform
//! `(text, max/min length) -> summary` call. Model selection is a closed enum:
//! an unknown identifier fails validation before any weights are touched.
//!
//! Long inputs are truncated to the encoder window rather than chunked; this
//! is a known limitation of the single-call contract.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::error::{MatomeError, Result};

/// Encoder context window; tokens beyond this are dropped.
const MAX_INPUT_TOKENS: usize = 512;

/// The closed set of supported summarization checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummarizerModel {
    /// Vanilla `t5-small` with the `summarize:` task prefix.
    T5Small,
    /// Instruction-tuned `google/flan-t5-small`.
    FlanT5Small,
}

impl SummarizerModel {
    /// All supported models, in display order.
    pub const ALL: [SummarizerModel; 2] = [SummarizerModel::T5Small, SummarizerModel::FlanT5Small];

    /// Canonical identifier accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarizerModel::T5Small => "t5-small",
            SummarizerModel::FlanT5Small => "flan-t5-small",
        }
    }

    /// Hugging Face hub repository for this checkpoint.
    pub fn hub_id(&self) -> &'static str {
        match self {
            SummarizerModel::T5Small => "t5-small",
            SummarizerModel::FlanT5Small => "google/flan-t5-small",
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(SummarizerModel::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SummarizerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummarizerModel {
    type Err = MatomeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "t5-small" => Ok(SummarizerModel::T5Small),
            "flan-t5-small" => Ok(SummarizerModel::FlanT5Small),
            other => Err(MatomeError::UnsupportedModel {
                given: other.to_string(),
                supported: Self::supported_list(),
            }),
        }
    }
}

/// Length bounds for generated summaries, in decoder tokens.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub max_length: usize,
    pub min_length: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 40,
        }
    }
}

/// Abstractive summarizer backed by a pretrained seq2seq model.
pub struct AbstractiveSummarizer {
    model: t5::T5ForConditionalGeneration,
    config: t5::Config,
    tokenizer: Tokenizer,
    device: Device,
    which: SummarizerModel,
}

impl AbstractiveSummarizer {
    /// Load a checkpoint from a local directory containing `config.json`,
    /// `tokenizer.json`, and `model.safetensors`.
    pub fn from_dir<P: AsRef<Path>>(
        which: SummarizerModel,
        dir: P,
        device: &Device,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        Self::load(
            which,
            &dir.join("config.json"),
            &dir.join("tokenizer.json"),
            &dir.join("model.safetensors"),
            device,
        )
    }

    /// Fetch a checkpoint from the Hugging Face hub by identifier and load it.
    pub fn from_hub(which: SummarizerModel, device: &Device) -> Result<Self> {
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| MatomeError::ModelLoad(format!("hub api init failed: {e}")))?;
        let repo = api.model(which.hub_id().to_string());

        let fetch = |file: &str| {
            repo.get(file).map_err(|e| {
                MatomeError::ModelLoad(format!("fetch {file} for {which} failed: {e}"))
            })
        };
        let config = fetch("config.json")?;
        let tokenizer = fetch("tokenizer.json")?;
        let weights = fetch("model.safetensors")?;

        Self::load(which, &config, &tokenizer, &weights, device)
    }

    fn load(
        which: SummarizerModel,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        device: &Device,
    ) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| MatomeError::ModelLoad(format!("failed to read config: {e}")))?;
        let config: t5::Config = serde_json::from_str(&config_str)
            .map_err(|e| MatomeError::ModelLoad(format!("failed to parse config: {e}")))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| MatomeError::Tokenizer(e.to_string()))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)?
        };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;

        info!(model = %which, "loaded abstractive summarizer");

        Ok(Self {
            model,
            config,
            tokenizer,
            device: device.clone(),
            which,
        })
    }

    /// Which checkpoint this summarizer wraps.
    pub fn which(&self) -> SummarizerModel {
        self.which
    }

    /// Generate a summary for `text` within the given length bounds.
    ///
    /// Decoding is greedy; the end-of-sequence token is suppressed until
    /// `min_length` tokens have been produced.
    pub fn summarize(&mut self, text: &str, options: &GenerationOptions) -> Result<String> {
        if text.trim().is_empty() {
            return Err(MatomeError::EmptyInput);
        }

        // Task prefix per the original T5 summarization recipe.
        let prompt = format!("summarize: {}", text.trim());
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| MatomeError::Tokenizer(e.to_string()))?;

        let mut input_ids = encoding.get_ids().to_vec();
        if input_ids.len() > MAX_INPUT_TOKENS {
            debug!(
                tokens = input_ids.len(),
                limit = MAX_INPUT_TOKENS,
                "input truncated to encoder window"
            );
            input_ids.truncate(MAX_INPUT_TOKENS);
        }

        let input_ids = Tensor::new(input_ids.as_slice(), &self.device)?.unsqueeze(0)?;

        self.model.clear_kv_cache();
        let encoder_output = self.model.encode(&input_ids)?;

        let start_token = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let eos_token = self.config.eos_token_id as u32;

        let mut output_ids: Vec<u32> = vec![start_token];
        for step in 0..options.max_length {
            let decoder_ids = if step == 0 || !self.config.use_cache {
                Tensor::new(output_ids.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last = output_ids[output_ids.len() - 1];
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };

            let logits = self
                .model
                .decode(&decoder_ids, &encoder_output)?
                .squeeze(0)?;
            let logits: Vec<f32> = logits.to_vec1()?;

            let suppress_eos = step < options.min_length;
            let next = Self::argmax(&logits, suppress_eos.then_some(eos_token))?;

            if next == eos_token {
                break;
            }
            output_ids.push(next);
        }

        let summary = self
            .tokenizer
            .decode(&output_ids[1..], true)
            .map_err(|e| MatomeError::Tokenizer(e.to_string()))?;
        Ok(summary.trim().to_string())
    }

    /// Index of the largest logit, optionally skipping one forbidden token.
    fn argmax(logits: &[f32], forbidden: Option<u32>) -> Result<u32> {
        logits
            .iter()
            .enumerate()
            .filter(|(i, _)| forbidden != Some(*i as u32))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i as u32)
            .ok_or_else(|| MatomeError::Inference("empty logits".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip() {
        for model in SummarizerModel::ALL {
            assert_eq!(model.as_str().parse::<SummarizerModel>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_fails_validation_before_any_loading() {
        let err = "xyz".parse::<SummarizerModel>().unwrap_err();
        match err {
            MatomeError::UnsupportedModel { given, supported } => {
                assert_eq!(given, "xyz");
                assert!(supported.contains("t5-small"));
                assert!(supported.contains("flan-t5-small"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn generation_defaults_are_sane() {
        let opts = GenerationOptions::default();
        assert!(opts.min_length < opts.max_length);
    }

    #[test]
    fn argmax_respects_forbidden_token() {
        let logits = vec![0.1, 5.0, 0.3];
        assert_eq!(AbstractiveSummarizer::argmax(&logits, None).unwrap(), 1);
        assert_eq!(AbstractiveSummarizer::argmax(&logits, Some(1)).unwrap(), 2);
    }
}
