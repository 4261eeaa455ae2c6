//! Evaluation for trained multi-label classifiers.
//!
//! Logits are pushed through a sigmoid and thresholded at a fixed 0.5; the
//! report carries per-label precision, recall, and F1 plus micro and macro
//! averages over the whole evaluation set.

use std::fmt;

use anyhow::Result;
use candle_core::Tensor;
use tracing::info;

use matome_core::LabelVocabulary;

/// Probability cutoff separating a predicted label from an absent one.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Confusion counts and derived metrics for one label.
#[derive(Debug, Clone, Default)]
pub struct LabelMetrics {
    pub label: String,
    pub true_positives: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
}

impl LabelMetrics {
    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// Number of gold occurrences of this label in the evaluation set.
    pub fn support(&self) -> u32 {
        self.true_positives + self.false_negatives
    }
}

fn ratio(num: u32, denom: u32) -> f32 {
    if denom == 0 { 0.0 } else { num as f32 / denom as f32 }
}

/// Per-label metrics plus corpus-level averages.
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub labels: Vec<LabelMetrics>,
    pub examples: usize,
}

impl ClassificationReport {
    /// Accumulate a report from probability rows and gold label rows.
    ///
    /// Both matrices are `[examples][num_labels]`; rows must match the
    /// vocabulary order used at training time.
    pub fn from_probabilities(
        vocab: &LabelVocabulary,
        probabilities: &[Vec<f32>],
        gold: &[Vec<f32>],
    ) -> Self {
        let mut labels: Vec<LabelMetrics> = vocab
            .names()
            .iter()
            .map(|name| LabelMetrics {
                label: name.clone(),
                ..Default::default()
            })
            .collect();

        for (probs, truth) in probabilities.iter().zip(gold) {
            for (j, metrics) in labels.iter_mut().enumerate() {
                let predicted = probs[j] >= DECISION_THRESHOLD;
                let actual = truth[j] >= DECISION_THRESHOLD;
                match (predicted, actual) {
                    (true, true) => metrics.true_positives += 1,
                    (true, false) => metrics.false_positives += 1,
                    (false, true) => metrics.false_negatives += 1,
                    (false, false) => {}
                }
            }
        }

        Self {
            labels,
            examples: probabilities.len(),
        }
    }

    /// Micro-averaged (precision, recall, f1): pool counts across labels.
    pub fn micro(&self) -> (f32, f32, f32) {
        let pooled = self.labels.iter().fold(LabelMetrics::default(), |mut acc, m| {
            acc.true_positives += m.true_positives;
            acc.false_positives += m.false_positives;
            acc.false_negatives += m.false_negatives;
            acc
        });
        (pooled.precision(), pooled.recall(), pooled.f1())
    }

    /// Macro-averaged (precision, recall, f1): unweighted mean over labels.
    pub fn macro_avg(&self) -> (f32, f32, f32) {
        if self.labels.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = self.labels.len() as f32;
        let (p, r, f) = self.labels.iter().fold((0.0, 0.0, 0.0), |(p, r, f), m| {
            (p + m.precision(), r + m.recall(), f + m.f1())
        });
        (p / n, r / n, f / n)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>9} {:>9} {:>9} {:>9}",
            "label", "precision", "recall", "f1", "support"
        )?;
        for m in &self.labels {
            writeln!(
                f,
                "{:<16} {:>9.3} {:>9.3} {:>9.3} {:>9}",
                m.label,
                m.precision(),
                m.recall(),
                m.f1(),
                m.support()
            )?;
        }
        let total: u32 = self.labels.iter().map(LabelMetrics::support).sum();
        let (mp, mr, mf) = self.micro();
        let (ap, ar, af) = self.macro_avg();
        writeln!(
            f,
            "{:<16} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            "micro avg", mp, mr, mf, total
        )?;
        writeln!(
            f,
            "{:<16} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            "macro avg", ap, ar, af, total
        )?;
        write!(f, "examples: {}", self.examples)
    }
}

/// Score a logits tensor against gold labels.
///
/// `logits` and `gold` are `[batch, num_labels]`; the sigmoid runs on-device
/// and the thresholding happens on the host.
pub fn evaluate_logits(
    vocab: &LabelVocabulary,
    logits: &Tensor,
    gold: &Tensor,
) -> Result<ClassificationReport> {
    let probabilities: Vec<Vec<f32>> = candle_nn::ops::sigmoid(logits)?.to_vec2()?;
    let truth: Vec<Vec<f32>> = gold.to_vec2()?;
    let report = ClassificationReport::from_probabilities(vocab, &probabilities, &truth);

    let (p, r, f1) = report.micro();
    info!(
        examples = report.examples,
        micro_precision = p,
        micro_recall = r,
        micro_f1 = f1,
        "evaluation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn vocab() -> LabelVocabulary {
        LabelVocabulary::from_names(vec!["joy".into(), "sadness".into()])
    }

    #[test]
    fn perfect_predictions_score_one() {
        let probs = vec![vec![0.9, 0.1], vec![0.2, 0.8]];
        let gold = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let report = ClassificationReport::from_probabilities(&vocab(), &probs, &gold);

        for m in &report.labels {
            assert_eq!(m.precision(), 1.0);
            assert_eq!(m.recall(), 1.0);
            assert_eq!(m.f1(), 1.0);
        }
        assert_eq!(report.micro(), (1.0, 1.0, 1.0));
    }

    #[test]
    fn threshold_is_inclusive_at_half() {
        let probs = vec![vec![0.5, 0.4999]];
        let gold = vec![vec![1.0, 1.0]];
        let report = ClassificationReport::from_probabilities(&vocab(), &probs, &gold);

        assert_eq!(report.labels[0].true_positives, 1);
        assert_eq!(report.labels[1].false_negatives, 1);
    }

    #[test]
    fn mixed_predictions_count_per_label() {
        // joy: 1 TP, 1 FP; sadness: 1 FN, nothing predicted.
        let probs = vec![vec![0.9, 0.1], vec![0.7, 0.2]];
        let gold = vec![vec![1.0, 1.0], vec![0.0, 0.0]];
        let report = ClassificationReport::from_probabilities(&vocab(), &probs, &gold);

        let joy = &report.labels[0];
        assert_eq!((joy.true_positives, joy.false_positives), (1, 1));
        assert_eq!(joy.precision(), 0.5);
        assert_eq!(joy.recall(), 1.0);

        let sadness = &report.labels[1];
        assert_eq!(sadness.false_negatives, 1);
        assert_eq!(sadness.recall(), 0.0);
        assert_eq!(sadness.f1(), 0.0);
    }

    #[test]
    fn empty_label_counts_do_not_divide_by_zero() {
        let report = ClassificationReport::from_probabilities(&vocab(), &[], &[]);
        assert_eq!(report.micro(), (0.0, 0.0, 0.0));
        assert_eq!(report.macro_avg(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn evaluate_logits_applies_sigmoid() {
        let device = Device::Cpu;
        // Large positive logit -> prob near 1; large negative -> near 0.
        let logits = Tensor::from_vec(vec![4.0f32, -4.0], (1, 2), &device).unwrap();
        let gold = Tensor::from_vec(vec![1.0f32, 0.0], (1, 2), &device).unwrap();

        let report = evaluate_logits(&vocab(), &logits, &gold).unwrap();
        assert_eq!(report.labels[0].true_positives, 1);
        assert_eq!(report.labels[1].false_positives, 0);
    }

    #[test]
    fn report_renders_a_table() {
        let probs = vec![vec![0.9, 0.1]];
        let gold = vec![vec![1.0, 0.0]];
        let report = ClassificationReport::from_probabilities(&vocab(), &probs, &gold);
        let rendered = report.to_string();
        assert!(rendered.contains("precision"));
        assert!(rendered.contains("joy"));
        assert!(rendered.contains("macro avg"));
    }
}
