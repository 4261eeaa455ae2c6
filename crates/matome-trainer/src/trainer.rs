//! Shared multi-label training loop.
//!
//! Both classifier paths run the same procedure: for each epoch, reshuffle
//! the example indices, iterate mini-batches, compute
//! binary-cross-entropy-with-logits against the binarized labels, take an
//! AdamW step, then advance the linear warmup/decay schedule. The loop runs
//! for the configured number of epochs with no early stopping and no
//! intermediate checkpointing; the caller persists weights once at the end.

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use tracing::info;

use crate::batch::{shuffled_batches, EncodedBatch, TextBatcher};
use crate::data::Example;
use crate::model::{EncoderClassifier, TfidfClassifier};

use matome_core::LabelVocabulary;

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub warmup_steps: usize,
    pub max_seq_len: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 16,
            learning_rate: 1e-3,
            weight_decay: 0.01,
            warmup_steps: 10,
            max_seq_len: 128,
            seed: 42,
        }
    }
}

/// Summary of one completed epoch.
#[derive(Debug, Clone)]
pub struct EpochStats {
    pub epoch: usize,
    pub mean_loss: f32,
    pub batches: usize,
}

/// Linear warmup to the peak learning rate, then linear decay to zero over
/// the remaining steps.
pub struct LinearSchedule {
    peak_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
    step: usize,
}

impl LinearSchedule {
    pub fn new(peak_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            peak_lr,
            warmup_steps,
            total_steps: total_steps.max(1),
            step: 0,
        }
    }

    /// Advance one step and return the learning rate for that update.
    pub fn next_lr(&mut self) -> f64 {
        self.step += 1;
        if self.step <= self.warmup_steps && self.warmup_steps > 0 {
            self.peak_lr * self.step as f64 / self.warmup_steps as f64
        } else {
            let decay_steps = (self.total_steps - self.warmup_steps).max(1);
            let done = (self.step - self.warmup_steps).min(decay_steps);
            self.peak_lr * (1.0 - done as f64 / decay_steps as f64)
        }
    }
}

/// Run the epoch/batch loop over an arbitrary forward pass.
///
/// `forward` receives the indices of one shuffled batch and returns
/// `(logits, labels)` tensors of shape `[batch, num_labels]`.
pub fn run_epochs<F>(
    varmap: &VarMap,
    config: &TrainConfig,
    num_examples: usize,
    mut forward: F,
) -> Result<Vec<EpochStats>>
where
    F: FnMut(&[usize]) -> Result<(Tensor, Tensor)>,
{
    anyhow::ensure!(num_examples > 0, "cannot train on an empty dataset");

    let batches_per_epoch = num_examples.div_ceil(config.batch_size.max(1));
    let total_steps = batches_per_epoch * config.epochs;
    let mut schedule = LinearSchedule::new(config.learning_rate, config.warmup_steps, total_steps);

    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )
    .context("failed to create optimizer")?;

    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        let plan = shuffled_batches(num_examples, config.batch_size, config.seed, epoch);
        let mut loss_sum = 0.0f32;

        for indices in &plan {
            let (logits, labels) = forward(indices)?;
            let loss = candle_nn::loss::binary_cross_entropy_with_logit(&logits, &labels)
                .context("loss computation failed")?;
            // Schedule advances first so the initial update already runs at
            // the first warmup fraction, not the peak rate.
            optimizer.set_learning_rate(schedule.next_lr());
            optimizer.backward_step(&loss).context("optimizer step failed")?;
            loss_sum += loss.to_scalar::<f32>()?;
        }

        let stats = EpochStats {
            epoch,
            mean_loss: loss_sum / plan.len() as f32,
            batches: plan.len(),
        };
        info!(
            epoch = stats.epoch,
            mean_loss = stats.mean_loss,
            batches = stats.batches,
            "epoch complete"
        );
        history.push(stats);
    }

    Ok(history)
}

/// Train the embedding encoder classifier end to end.
pub fn train_encoder(
    model: &EncoderClassifier,
    varmap: &VarMap,
    batcher: &TextBatcher,
    examples: &[Example],
    vocab: &LabelVocabulary,
    config: &TrainConfig,
) -> Result<Vec<EpochStats>> {
    run_epochs(varmap, config, examples.len(), |indices| {
        let batch: EncodedBatch = batcher.encode(examples, indices, vocab)?;
        let logits = model.forward(&batch)?;
        Ok((logits, batch.labels))
    })
}

/// Train the tf-idf baseline classifier.
pub fn train_tfidf(
    model: &TfidfClassifier,
    varmap: &VarMap,
    examples: &[Example],
    vocab: &LabelVocabulary,
    config: &TrainConfig,
    device: &Device,
) -> Result<Vec<EpochStats>> {
    run_epochs(varmap, config, examples.len(), |indices| {
        let texts: Vec<&str> = indices.iter().map(|&i| examples[i].text.as_str()).collect();
        let logits = model.forward_texts(&texts)?;

        let mut rows = Vec::with_capacity(indices.len() * vocab.len());
        for &i in indices {
            rows.extend(vocab.binarize(&examples[i].labels)?);
        }
        let labels = Tensor::from_vec(rows, (indices.len(), vocab.len()), device)?;
        Ok((logits, labels))
    })
}
