//! Fixed-vocabulary multi-label encoding.
//!
//! A [`LabelVocabulary`] is established once from the training corpus and
//! never changes for the lifetime of a trained model: vector position is
//! label identity. Binarization maps a variable-length label set to a
//! fixed-width 0/1 indicator vector aligned to that order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MatomeError, Result};

/// Ordered label vocabulary with stable positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelVocabulary {
    names: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelVocabulary {
    /// Build the vocabulary from the label sets of a training corpus.
    ///
    /// Label names are deduplicated and sorted, so the resulting order is
    /// deterministic regardless of corpus iteration order.
    pub fn from_corpus<'a, I, L>(label_sets: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut seen = HashMap::new();
        for set in label_sets {
            for label in set {
                if seen.insert(label.to_string(), ()).is_none() {
                    names.push(label.to_string());
                }
            }
        }
        names.sort();
        Self::from_names(names)
    }

    /// Build the vocabulary from an explicit ordered list of names.
    ///
    /// The given order is kept as-is; use this when restoring a vocabulary
    /// saved alongside a trained model.
    pub fn from_names(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Number of labels (the fixed vector width).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label names in vocabulary order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a label name, if present.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Encode a label set into a fixed-width 0/1 indicator vector.
    ///
    /// Labels outside the vocabulary are an error: silently dropping them
    /// would desynchronize training targets from the corpus.
    pub fn binarize<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.names.len()];
        for label in labels {
            let pos = self
                .position(label.as_ref())
                .ok_or_else(|| MatomeError::UnknownLabel(label.as_ref().to_string()))?;
            vector[pos] = 1.0;
        }
        Ok(vector)
    }

    /// Decode an indicator vector back into the label names it marks.
    ///
    /// Any value >= 0.5 counts as set, so thresholded sigmoid outputs decode
    /// directly. `binarize` followed by `decode` reproduces the original
    /// label set (sorted).
    pub fn decode(&self, vector: &[f32]) -> Result<Vec<String>> {
        if vector.len() != self.names.len() {
            return Err(MatomeError::LabelWidthMismatch {
                got: vector.len(),
                expected: self.names.len(),
            });
        }
        Ok(vector
            .iter()
            .zip(self.names.iter())
            .filter(|&(&v, _)| v >= 0.5)
            .map(|(_, name)| name.clone())
            .collect())
    }

    /// Serialize the vocabulary to JSON for persistence next to model weights.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MatomeError::ModelLoad(format!("vocabulary serialization failed: {e}")))
    }

    /// Restore a vocabulary from its JSON form, rebuilding the name index.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: LabelVocabulary = serde_json::from_str(json)
            .map_err(|e| MatomeError::ModelLoad(format!("vocabulary parse failed: {e}")))?;
        Ok(Self::from_names(parsed.names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> LabelVocabulary {
        LabelVocabulary::from_corpus(vec![
            vec!["joy", "love"],
            vec!["anger"],
            vec!["joy", "surprise"],
        ])
    }

    #[test]
    fn corpus_order_is_sorted_and_deduplicated() {
        let v = vocab();
        assert_eq!(v.names(), &["anger", "joy", "love", "surprise"]);
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn binarize_decode_round_trip() {
        let v = vocab();
        let encoded = v.binarize(&["love", "joy"]).unwrap();
        assert_eq!(encoded, vec![0.0, 1.0, 1.0, 0.0]);

        let decoded = v.decode(&encoded).unwrap();
        assert_eq!(decoded, vec!["joy".to_string(), "love".to_string()]);
    }

    #[test]
    fn empty_label_set_round_trips() {
        let v = vocab();
        let encoded = v.binarize::<&str>(&[]).unwrap();
        assert_eq!(encoded, vec![0.0; 4]);
        assert!(v.decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn decode_threshold_is_inclusive_at_half() {
        let v = vocab();
        let decoded = v.decode(&[0.5, 0.49, 1.0, 0.0]).unwrap();
        assert_eq!(decoded, vec!["anger".to_string(), "love".to_string()]);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let v = vocab();
        let err = v.binarize(&["despair"]).unwrap_err();
        assert!(err.to_string().contains("despair"));
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let v = vocab();
        assert!(v.decode(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let v = vocab();
        let json = v.to_json().unwrap();
        let restored = LabelVocabulary::from_json(&json).unwrap();
        assert_eq!(restored.names(), v.names());
        assert_eq!(restored.position("joy"), Some(1));
    }
}
