//! Tokenization and batch assembly.
//!
//! An [`EncodedBatch`] is produced fresh for every training step: token ids
//! padded/truncated to a fixed length, an attention mask separating real
//! tokens from padding, and the binarized label matrix.

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use matome_core::LabelVocabulary;

use crate::data::Example;

/// One tokenized mini-batch, owned by the training loop for a single step.
#[derive(Debug)]
pub struct EncodedBatch {
    /// Token ids, shape `[batch, max_seq_len]`, u32.
    pub input_ids: Tensor,
    /// 1.0 for real tokens, 0.0 for padding, shape `[batch, max_seq_len]`.
    pub attention_mask: Tensor,
    /// Binarized labels, shape `[batch, num_labels]`, f32.
    pub labels: Tensor,
}

/// Turns raw examples into fixed-shape tensors.
pub struct TextBatcher {
    tokenizer: Tokenizer,
    max_seq_len: usize,
    device: Device,
}

impl TextBatcher {
    /// Wrap a tokenizer, configuring fixed-length padding and truncation.
    pub fn new(mut tokenizer: Tokenizer, max_seq_len: usize, device: Device) -> Result<Self> {
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_seq_len),
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("truncation config failed: {e}"))?;

        Ok(Self {
            tokenizer,
            max_seq_len,
            device,
        })
    }

    /// Load the tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: &str, max_seq_len: usize, device: Device) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer {path}: {e}"))?;
        Self::new(tokenizer, max_seq_len, device)
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// Tokenizer vocabulary size, including added tokens. This bounds every
    /// id the batcher can emit, so it sizes the embedding table.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Encode the examples at `indices` into one batch.
    pub fn encode(
        &self,
        examples: &[Example],
        indices: &[usize],
        vocab: &LabelVocabulary,
    ) -> Result<EncodedBatch> {
        let texts: Vec<&str> = indices
            .iter()
            .map(|&i| examples[i].text.as_str())
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;

        let batch = indices.len();
        let mut ids = Vec::with_capacity(batch * self.max_seq_len);
        let mut mask = Vec::with_capacity(batch * self.max_seq_len);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            mask.extend(
                encoding
                    .get_attention_mask()
                    .iter()
                    .map(|&m| m as f32),
            );
        }

        let mut label_rows = Vec::with_capacity(batch * vocab.len());
        for &i in indices {
            let row = vocab
                .binarize(&examples[i].labels)
                .context("label binarization failed")?;
            label_rows.extend(row);
        }

        let input_ids =
            Tensor::from_vec(ids, (batch, self.max_seq_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(mask, (batch, self.max_seq_len), &self.device)?;
        let labels = Tensor::from_vec(label_rows, (batch, vocab.len()), &self.device)?;

        Ok(EncodedBatch {
            input_ids,
            attention_mask,
            labels,
        })
    }
}

/// Shuffled batch index plan for one epoch.
///
/// Fisher-Yates over example indices with a seeded RNG; the seed is derived
/// from the base seed and the epoch so runs are reproducible but each epoch
/// sees a different order.
pub fn shuffled_batches(
    num_examples: usize,
    batch_size: usize,
    seed: u64,
    epoch: usize,
) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..num_examples).collect();
    let mut rng = oorandom::Rand64::new(u128::from(seed.wrapping_add(epoch as u64)));
    for i in (1..indices.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        indices.swap(i, j);
    }

    indices
        .chunks(batch_size.max(1))
        .map(<[usize]>::to_vec)
        .collect()
}

// pub(crate): sibling modules' tests share the fixture tokenizer.
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::Example;

    /// Minimal WordLevel tokenizer for tests; `[PAD]` is id 0 so the default
    /// padding parameters apply.
    pub(crate) fn test_tokenizer() -> Tokenizer {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": {"type": "Lowercase"},
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {
                    "[PAD]": 0, "[UNK]": 1, "happy": 2, "sad": 3, "day": 4,
                    "very": 5, "a": 6, "today": 7, "was": 8
                },
                "unk_token": "[UNK]"
            }
        }"#;
        Tokenizer::from_bytes(json.as_bytes()).unwrap()
    }

    fn corpus() -> (Vec<Example>, LabelVocabulary) {
        let examples = vec![
            Example::new("a very happy day", vec!["joy".into()]),
            Example::new("today was sad", vec!["sadness".into()]),
            Example::new("happy and sad", vec!["joy".into(), "sadness".into()]),
        ];
        let vocab = crate::data::vocabulary_from_examples(&examples);
        (examples, vocab)
    }

    #[test]
    fn batch_tensors_have_fixed_shapes() {
        let (examples, vocab) = corpus();
        let batcher = TextBatcher::new(test_tokenizer(), 6, Device::Cpu).unwrap();

        let batch = batcher.encode(&examples, &[0, 1, 2], &vocab).unwrap();
        assert_eq!(batch.input_ids.dims(), &[3, 6]);
        assert_eq!(batch.attention_mask.dims(), &[3, 6]);
        assert_eq!(batch.labels.dims(), &[3, 2]);
    }

    #[test]
    fn attention_mask_marks_padding() {
        let (examples, vocab) = corpus();
        let batcher = TextBatcher::new(test_tokenizer(), 6, Device::Cpu).unwrap();

        let batch = batcher.encode(&examples, &[1], &vocab).unwrap();
        let mask: Vec<Vec<f32>> = batch.attention_mask.to_vec2().unwrap();
        // "today was sad" is three real tokens, the rest is padding.
        assert_eq!(mask[0][..3], [1.0, 1.0, 1.0]);
        assert_eq!(mask[0][3..], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn label_rows_follow_vocabulary_order() {
        let (examples, vocab) = corpus();
        assert_eq!(vocab.names(), &["joy", "sadness"]);
        let batcher = TextBatcher::new(test_tokenizer(), 4, Device::Cpu).unwrap();

        let batch = batcher.encode(&examples, &[2, 0], &vocab).unwrap();
        let labels: Vec<Vec<f32>> = batch.labels.to_vec2().unwrap();
        assert_eq!(labels[0], [1.0, 1.0]);
        assert_eq!(labels[1], [1.0, 0.0]);
    }

    #[test]
    fn shuffled_batches_cover_every_index_once() {
        let batches = shuffled_batches(10, 3, 42, 0);
        assert_eq!(batches.len(), 4);
        let mut all: Vec<usize> = batches.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_is_seed_deterministic_and_epoch_varying() {
        let a = shuffled_batches(32, 8, 7, 0);
        let b = shuffled_batches(32, 8, 7, 0);
        let c = shuffled_batches(32, 8, 7, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
