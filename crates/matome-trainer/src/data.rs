//! Dataset loading for multi-label training corpora.
//!
//! Two ingestion paths: a local CSV with `text` and `labels` columns, and a
//! hosted JSONL dataset fetched from the Hugging Face hub by identifier.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use matome_core::LabelVocabulary;

/// A single training example: raw text and its (possibly empty) label set.
#[derive(Debug, Clone)]
pub struct Example {
    pub text: String,
    pub labels: Vec<String>,
}

impl Example {
    pub fn new(text: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            text: text.into(),
            labels,
        }
    }
}

/// Build the fixed label vocabulary from a corpus.
pub fn vocabulary_from_examples(examples: &[Example]) -> LabelVocabulary {
    LabelVocabulary::from_corpus(
        examples
            .iter()
            .map(|e| e.labels.iter().map(String::as_str)),
    )
}

/// Load a CSV dataset with required `text` and `labels` header columns.
///
/// The `labels` cell holds a comma-separated label list; an empty cell means
/// the example carries no labels. Quoted fields and embedded newlines are
/// handled; a missing file or malformed header is fatal.
pub fn load_csv_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<Example>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let mut records = parse_csv(&content).into_iter();
    let header = match records.next() {
        Some(h) => h,
        None => bail!("dataset {} is empty", path.display()),
    };

    let text_col = column_index(&header, "text")
        .with_context(|| format!("dataset {} has no `text` column", path.display()))?;
    let labels_col = column_index(&header, "labels")
        .with_context(|| format!("dataset {} has no `labels` column", path.display()))?;

    let mut examples = Vec::new();
    for (line, record) in records.enumerate() {
        if record.len() <= text_col.max(labels_col) {
            bail!(
                "dataset {}: record {} has {} fields, expected at least {}",
                path.display(),
                line + 2,
                record.len(),
                text_col.max(labels_col) + 1
            );
        }
        examples.push(Example {
            text: record[text_col].clone(),
            labels: split_label_cell(&record[labels_col]),
        });
    }

    info!(count = examples.len(), path = %path.display(), "loaded CSV dataset");
    Ok(examples)
}

fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h.trim() == name)
}

fn split_label_cell(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Minimal CSV record parser: comma-separated, double-quote quoting, `""`
/// escapes inside quoted fields, newlines allowed inside quotes.
fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                }
                record.clear();
            }
            _ => field.push(c),
        }
    }

    // Trailing record without final newline
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

/// One record of the hosted JSONL dataset format.
#[derive(Debug, Deserialize)]
struct HubRecord {
    text: String,
    #[serde(default)]
    labels: Vec<String>,
}

/// Download a named public dataset file from the Hugging Face hub.
///
/// Returns the local cache path of the fetched file. Network failures
/// propagate and terminate the run.
pub fn fetch_hub_file(dataset_id: &str, filename: &str) -> Result<PathBuf> {
    let api = hf_hub::api::sync::Api::new().context("hub api init failed")?;
    let repo = api.dataset(dataset_id.to_string());
    let path = repo
        .get(filename)
        .with_context(|| format!("failed to fetch {filename} from dataset {dataset_id}"))?;
    info!(dataset = dataset_id, file = filename, path = %path.display(), "fetched hub dataset file");
    Ok(path)
}

/// Fetch a hosted dataset by identifier and parse its JSONL records.
pub fn fetch_hub_dataset(dataset_id: &str, filename: &str) -> Result<Vec<Example>> {
    let path = fetch_hub_file(dataset_id, filename)?;
    load_jsonl_dataset(path)
}

/// Parse a JSONL dataset file: one `{"text": ..., "labels": [...]}` per line.
pub fn load_jsonl_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<Example>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let mut examples = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: HubRecord = serde_json::from_str(line)
            .with_context(|| format!("dataset {}: bad record on line {}", path.display(), i + 1))?;
        examples.push(Example {
            text: record.text,
            labels: record.labels,
        });
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_records() {
        let records = parse_csv("text,labels\nhello world,joy\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], vec!["hello world", "joy"]);
    }

    #[test]
    fn parse_quoted_fields_with_commas_and_quotes() {
        let records = parse_csv("\"a, b\",\"say \"\"hi\"\"\"\n");
        assert_eq!(records[0], vec!["a, b", "say \"hi\""]);
    }

    #[test]
    fn parse_newline_inside_quotes() {
        let records = parse_csv("\"line one\nline two\",x\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][0], "line one\nline two");
    }

    #[test]
    fn label_cell_splits_and_trims() {
        assert_eq!(split_label_cell("joy, anger ,love"), ["joy", "anger", "love"]);
        assert!(split_label_cell("").is_empty());
    }

    #[test]
    fn csv_dataset_round_trip() {
        let dir = std::env::temp_dir().join("matome-data-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("train.csv");
        std::fs::write(
            &path,
            "text,labels\nI loved it,\"joy,love\"\nterrible day,anger\nno labels here,\n",
        )
        .unwrap();

        let examples = load_csv_dataset(&path).unwrap();
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].labels, ["joy", "love"]);
        assert_eq!(examples[1].text, "terrible day");
        assert!(examples[2].labels.is_empty());

        let vocab = vocabulary_from_examples(&examples);
        assert_eq!(vocab.names(), &["anger", "joy", "love"]);
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let dir = std::env::temp_dir().join("matome-data-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        std::fs::write(&path, "body,tags\nhello,x\n").unwrap();
        assert!(load_csv_dataset(&path).is_err());
    }

    #[test]
    fn jsonl_records_parse() {
        let dir = std::env::temp_dir().join("matome-data-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("train.jsonl");
        std::fs::write(
            &path,
            "{\"text\": \"so happy\", \"labels\": [\"joy\"]}\n{\"text\": \"meh\"}\n",
        )
        .unwrap();

        let examples = load_jsonl_dataset(&path).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].labels, ["joy"]);
        assert!(examples[1].labels.is_empty());
    }
}
