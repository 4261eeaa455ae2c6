//! Classifier models for the multi-label pipelines.
//!
//! Two paths share the `forward -> logits [batch, num_labels]` contract: a
//! TF-IDF bag-of-words baseline with a logistic-regression head, and a
//! trainable embedding encoder with masked mean pooling. Parameters live in a
//! candle `VarMap` and are only ever mutated through optimizer steps.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Module, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};

use crate::batch::EncodedBatch;

/// Bag-of-words TF-IDF featurizer fitted once on the training corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and inverse document frequencies on a corpus.
    pub fn fit<'a, I: IntoIterator<Item = &'a str>>(corpus: I) -> Self {
        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<u32> = Vec::new();
        let mut num_docs = 0u32;

        for document in corpus {
            num_docs += 1;
            let mut seen = Vec::new();
            for token in Self::tokens(document) {
                let next_id = vocab.len();
                let id = *vocab.entry(token).or_insert(next_id);
                if id == doc_freq.len() {
                    doc_freq.push(0);
                }
                if !seen.contains(&id) {
                    doc_freq[id] += 1;
                    seen.push(id);
                }
            }
        }

        // Smoothed idf, as in the usual tf-idf formulation.
        let idf = doc_freq
            .iter()
            .map(|&df| ((1.0 + num_docs as f32) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        Self { vocab, idf }
    }

    /// Feature dimensionality (fitted vocabulary size).
    pub fn dim(&self) -> usize {
        self.vocab.len()
    }

    /// Transform one document into an L2-normalized tf-idf vector.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut features = vec![0.0f32; self.vocab.len()];
        for token in Self::tokens(text) {
            if let Some(&id) = self.vocab.get(&token) {
                features[id] += self.idf[id];
            }
        }
        let norm = features.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut features {
                *v /= norm;
            }
        }
        features
    }

    /// Transform a batch of documents into a `[batch, dim]` tensor.
    pub fn transform_batch(&self, texts: &[&str], device: &Device) -> candle_core::Result<Tensor> {
        let mut rows = Vec::with_capacity(texts.len() * self.dim());
        for text in texts {
            rows.extend(self.transform(text));
        }
        Tensor::from_vec(rows, (texts.len(), self.dim()), device)
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

/// TF-IDF + logistic-regression baseline classifier.
pub struct TfidfClassifier {
    pub vectorizer: TfidfVectorizer,
    head: candle_nn::Linear,
    device: Device,
}

impl TfidfClassifier {
    /// Create a trainable classifier over a fitted vectorizer.
    pub fn new_trainable(
        vectorizer: TfidfVectorizer,
        num_labels: usize,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let head = candle_nn::linear(vectorizer.dim(), num_labels, vb.pp("head"))
            .context("failed to create tf-idf head")?;
        Ok(Self {
            vectorizer,
            head,
            device: device.clone(),
        })
    }

    /// Logits for a batch of raw texts, shape `[batch, num_labels]`.
    pub fn forward_texts(&self, texts: &[&str]) -> candle_core::Result<Tensor> {
        let features = self.vectorizer.transform_batch(texts, &self.device)?;
        self.head.forward(&features)
    }
}

/// Architecture hyperparameters for the encoder classifier, persisted next to
/// the weights so evaluation can rebuild the same shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub intermediate_size: usize,
    pub num_labels: usize,
}

impl EncoderConfig {
    pub fn new(vocab_size: usize, num_labels: usize) -> Self {
        Self {
            vocab_size,
            hidden_size: 128,
            intermediate_size: 256,
            num_labels,
        }
    }
}

/// Trainable embedding encoder with masked mean pooling and a 2-layer head.
///
/// ```text
/// ids [B,L] -> Embedding -> [B,L,H] -> masked mean -> [B,H]
///           -> Linear(H, I) -> ReLU -> Linear(I, C) -> logits [B,C]
/// ```
pub struct EncoderClassifier {
    embeddings: candle_nn::Embedding,
    fc1: candle_nn::Linear,
    fc2: candle_nn::Linear,
}

impl EncoderClassifier {
    /// Create a classifier with fresh trainable weights in `varmap`.
    pub fn new_trainable(
        config: &EncoderConfig,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::build(config, vb)
    }

    /// Load a trained classifier from a safetensors file.
    pub fn load<P: AsRef<Path>>(
        path: P,
        config: &EncoderConfig,
        device: &Device,
    ) -> Result<Self> {
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path.as_ref()], DType::F32, device)
                .context("failed to load encoder weights")?
        };
        Self::build(config, vb)
    }

    fn build(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        let embeddings =
            candle_nn::embedding(config.vocab_size, config.hidden_size, vb.pp("embeddings"))
                .context("failed to create embeddings")?;
        let fc1 = candle_nn::linear(config.hidden_size, config.intermediate_size, vb.pp("fc1"))
            .context("failed to create fc1")?;
        let fc2 = candle_nn::linear(config.intermediate_size, config.num_labels, vb.pp("fc2"))
            .context("failed to create fc2")?;
        Ok(Self {
            embeddings,
            fc1,
            fc2,
        })
    }

    /// Logits for one encoded batch, shape `[batch, num_labels]`.
    pub fn forward(&self, batch: &EncodedBatch) -> candle_core::Result<Tensor> {
        let embedded = self.embeddings.forward(&batch.input_ids)?;

        // Masked mean pooling over non-padding positions.
        let mask = batch.attention_mask.unsqueeze(2)?;
        let summed = embedded.broadcast_mul(&mask)?.sum(1)?;
        let counts = (batch.attention_mask.sum_keepdim(1)? + 1e-9)?;
        let pooled = summed.broadcast_div(&counts)?;

        let hidden = self.fc1.forward(&pooled)?.relu()?;
        self.fc2.forward(&hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TextBatcher;
    use crate::data::{vocabulary_from_examples, Example};

    #[test]
    fn tfidf_vocabulary_and_idf_align() {
        let v = TfidfVectorizer::fit(["the cat sat", "the dog ran"]);
        assert_eq!(v.dim(), 5);
        // "the" appears in both documents, so its idf is the smallest.
        let the_id = v.vocab["the"];
        let min_idf = v.idf.iter().cloned().fold(f32::INFINITY, f32::min);
        assert_eq!(v.idf[the_id], min_idf);
    }

    #[test]
    fn tfidf_vectors_are_l2_normalized() {
        let v = TfidfVectorizer::fit(["alpha beta gamma", "beta delta"]);
        let features = v.transform("alpha beta beta");
        let norm: f32 = features.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tfidf_unknown_words_produce_zero_vector() {
        let v = TfidfVectorizer::fit(["alpha beta"]);
        let features = v.transform("completely unseen words");
        assert!(features.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn tfidf_classifier_logit_shape() {
        let v = TfidfVectorizer::fit(["good movie", "bad movie"]);
        let varmap = VarMap::new();
        let clf = TfidfClassifier::new_trainable(v, 3, &varmap, &Device::Cpu).unwrap();
        let logits = clf.forward_texts(&["good movie", "bad film"]).unwrap();
        assert_eq!(logits.dims(), &[2, 3]);
    }

    #[test]
    fn encoder_logit_shape_and_finiteness() {
        let examples = vec![
            Example::new("a very happy day", vec!["joy".into()]),
            Example::new("today was sad", vec!["sadness".into()]),
        ];
        let vocab = vocabulary_from_examples(&examples);
        let batcher =
            TextBatcher::new(crate::batch::tests::test_tokenizer(), 6, Device::Cpu).unwrap();
        let batch = batcher.encode(&examples, &[0, 1], &vocab).unwrap();

        let config = EncoderConfig {
            vocab_size: 16,
            hidden_size: 8,
            intermediate_size: 16,
            num_labels: vocab.len(),
        };
        let varmap = VarMap::new();
        let model = EncoderClassifier::new_trainable(&config, &varmap, &Device::Cpu).unwrap();

        let logits = model.forward(&batch).unwrap();
        assert_eq!(logits.dims(), &[2, 2]);
        let values: Vec<Vec<f32>> = logits.to_vec2().unwrap();
        assert!(values.iter().flatten().all(|v| v.is_finite()));
    }
}
