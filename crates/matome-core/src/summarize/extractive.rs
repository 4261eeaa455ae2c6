//! # Frequency-based extractive summarizer
//!
//! Scores each sentence by the normalized frequencies of its content words
//! and returns the top-scoring sentences verbatim. No model weights are
//! involved; this is the cheap path next to the seq2seq summarizer.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashMap;

use regex::Regex;

use crate::error::{MatomeError, Result};
use crate::summarize::stopwords::is_stop_word;

/// A sentence candidate with its accumulated score.
///
/// Ordering is by score descending; equal scores prefer the sentence that
/// appears earlier in the document, so selection is deterministic.
#[derive(Debug, Clone, PartialEq)]
struct ScoredSentence {
    score: f32,
    index: usize,
    text: String,
}

impl Eq for ScoredSentence {}

impl Ord for ScoredSentence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            // BinaryHeap is a max-heap: higher index must compare lower.
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for ScoredSentence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extractive summarizer over word-frequency sentence scores.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    sentence_re: Regex,
}

impl ExtractiveSummarizer {
    /// Create a new extractive summarizer.
    pub fn new() -> Result<Self> {
        // A sentence is a run of text up to and including its terminator,
        // or a trailing terminator-less fragment.
        let sentence_re = Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$")?;
        Ok(Self { sentence_re })
    }

    /// Summarize `text` by selecting its `num_sentences` top-scoring sentences.
    ///
    /// The returned summary joins the selected sentences with single spaces in
    /// **selection order** (highest score first), not document order. Every
    /// sentence in the output is a verbatim substring of the input. If the
    /// document has fewer sentences than requested, all of them are returned.
    pub fn summarize(&self, text: &str, num_sentences: usize) -> Result<String> {
        if text.trim().is_empty() {
            return Err(MatomeError::EmptyInput);
        }

        let sentences = self.split_sentences(text);
        let word_scores = self.word_scores(text);

        let mut heap: BinaryHeap<ScoredSentence> = sentences
            .into_iter()
            .enumerate()
            .map(|(index, text)| ScoredSentence {
                score: self.score_sentence(&text, &word_scores),
                index,
                text,
            })
            .collect();

        let mut selected = Vec::with_capacity(num_sentences.min(heap.len()));
        while selected.len() < num_sentences {
            match heap.pop() {
                Some(sentence) => selected.push(sentence.text),
                None => break,
            }
        }

        Ok(selected.join(" "))
    }

    /// Split text into trimmed sentences, each a verbatim slice of the input.
    fn split_sentences(&self, text: &str) -> Vec<String> {
        self.sentence_re
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Per-word scores: content-word frequencies normalized by the maximum
    /// frequency in the document.
    fn word_scores(&self, text: &str) -> HashMap<String, f32> {
        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for word in Self::content_words(text) {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        // Empty frequency map guard: divide by 1 instead.
        let max_frequency = frequencies.values().copied().max().unwrap_or(1) as f32;

        frequencies
            .into_iter()
            .map(|(word, count)| (word, count as f32 / max_frequency))
            .collect()
    }

    fn score_sentence(&self, sentence: &str, word_scores: &HashMap<String, f32>) -> f32 {
        Self::content_words(sentence)
            .filter_map(|word| word_scores.get(&word))
            .sum()
    }

    /// Lowercased alphabetic tokens with stop words removed.
    fn content_words(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .filter(|w| !is_stop_word(w))
    }
}
