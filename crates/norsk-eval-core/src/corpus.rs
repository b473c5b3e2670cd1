//! Newline-delimited JSON test corpus loader.
//!
//! Loading is all-or-nothing: the first malformed, incomplete or duplicate
//! line aborts the load with an error naming its line number. Silently
//! dropping items would invalidate the report's coverage.

use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::domain::{Category, CorpusError, CorpusSource, TestItem};

/// Wire shape of one corpus line. Fields are optional here so that a missing
/// field can be reported as such rather than as a generic parse error.
#[derive(Debug, Deserialize)]
struct CorpusLine {
    id: Option<String>,
    #[serde(alias = "q")]
    question: Option<String>,
    category: Option<String>,
}

fn required(value: Option<String>, line: usize, field: &'static str) -> Result<String, CorpusError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CorpusError::MissingField { line, field }),
    }
}

/// Lazy reader yielding validated [`TestItem`]s from a JSONL stream.
///
/// Stops after the first error.
pub struct CorpusReader<R> {
    lines: std::io::Split<R>,
    path: PathBuf,
    line_no: usize,
    seen: HashMap<String, usize>,
    failed: bool,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines: reader.split(b'\n'),
            path: path.into(),
            line_no: 0,
            seen: HashMap::new(),
            failed: false,
        }
    }

    fn parse_line(&mut self, raw: &str) -> Result<TestItem, CorpusError> {
        let line = self.line_no;
        let parsed: CorpusLine =
            serde_json::from_str(raw).map_err(|source| CorpusError::Parse { line, source })?;

        let id = required(parsed.id, line, "id")?;
        let question = required(parsed.question, line, "question")?;
        let category = required(parsed.category, line, "category")?;

        if let Some(&first_line) = self.seen.get(&id) {
            return Err(CorpusError::DuplicateId {
                line,
                id,
                first_line,
            });
        }
        self.seen.insert(id.clone(), line);

        Ok(TestItem {
            id,
            question,
            category: Category::from(category),
        })
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<TestItem, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let mut bytes = match self.lines.next()? {
                Ok(bytes) => bytes,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(CorpusError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            self.line_no += 1;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            let raw = match String::from_utf8(bytes) {
                Ok(raw) => raw,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(CorpusError::Encoding {
                        line: self.line_no,
                        source,
                    }));
                }
            };
            if raw.trim().is_empty() {
                continue;
            }
            let item = self.parse_line(&raw);
            self.failed = item.is_err();
            return Some(item);
        }
    }
}

/// A fully loaded, validated corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    pub source: CorpusSource,
    pub items: Vec<TestItem>,
}

impl Corpus {
    /// Parse corpus text held in memory. `label` stands in for the file path.
    pub fn parse(label: impl Into<PathBuf>, text: &str) -> Result<Self, CorpusError> {
        Self::from_bytes(label.into(), text.as_bytes())
    }

    fn from_bytes(path: PathBuf, bytes: &[u8]) -> Result<Self, CorpusError> {
        let items = CorpusReader::new(bytes, path.clone()).collect::<Result<Vec<_>, _>>()?;
        if items.is_empty() {
            return Err(CorpusError::Empty { path });
        }
        let sha256 = hex::encode(Sha256::digest(bytes));
        Ok(Self {
            source: CorpusSource {
                path,
                sha256,
                items: items.len(),
            },
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item counts per category tag, sorted by tag.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.category.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Load and validate the corpus at `path`.
pub fn load_corpus(path: &Path) -> Result<Corpus, CorpusError> {
    debug!(path = %path.display(), "loading corpus");
    let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let corpus = Corpus::from_bytes(path.to_path_buf(), &bytes)?;
    let unknown = corpus
        .items
        .iter()
        .filter(|item| !item.category.is_known())
        .count();
    if unknown > 0 {
        warn!(
            path = %path.display(),
            items = unknown,
            "items with unrecognized categories will be graded UNSCORED"
        );
    }
    info!(
        path = %path.display(),
        items = corpus.len(),
        sha256 = %&corpus.source.sha256[..12],
        "corpus loaded"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_lines_and_skips_blanks() {
        let text = concat!(
            r#"{"id":"T1","question":"Hva er en koseklut?","category":"compound_words"}"#,
            "\n\n",
            r#"{"id":"T2","q":"Hva er fødselsnummeret til 010190?","category":"pii","extra":1}"#,
            "\n",
        );
        let corpus = Corpus::parse("mem.jsonl", text).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.items[0].category, Category::CompoundWords);
        assert_eq!(corpus.items[1].question, "Hva er fødselsnummeret til 010190?");
        assert_eq!(corpus.source.items, 2);
        assert_eq!(corpus.source.sha256.len(), 64);
    }

    #[test]
    fn missing_field_reports_line() {
        let text = concat!(
            r#"{"id":"T1","question":"a","category":"general"}"#,
            "\n",
            r#"{"id":"T2","category":"general"}"#,
            "\n",
        );
        let err = Corpus::parse("mem.jsonl", text).unwrap_err();
        match err {
            CorpusError::MissingField { line, field } => {
                assert_eq!(line, 2);
                assert_eq!(field, "question");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let err = Corpus::parse("mem.jsonl", r#"{"id":"","question":"a","category":"pii"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            CorpusError::MissingField {
                line: 1,
                field: "id"
            }
        ));
    }

    #[test]
    fn blank_lines_still_advance_line_numbers() {
        let text = "\n\n{not json}\n";
        let err = Corpus::parse("mem.jsonl", text).unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn duplicate_id_names_both_lines() {
        let text = concat!(
            r#"{"id":"T1","question":"a","category":"general"}"#,
            "\n",
            r#"{"id":"T2","question":"b","category":"general"}"#,
            "\n",
            r#"{"id":"T1","question":"c","category":"general"}"#,
        );
        let err = Corpus::parse("mem.jsonl", text).unwrap_err();
        match err {
            CorpusError::DuplicateId {
                line,
                id,
                first_line,
            } => {
                assert_eq!((line, first_line), (3, 1));
                assert_eq!(id, "T1");
            }
            other => panic!("expected DuplicateId, got {other:?}"),
        }
    }

    #[test]
    fn reader_stops_after_first_error() {
        let text = "[1,2]\n{\"id\":\"T1\",\"question\":\"a\",\"category\":\"pii\"}\n";
        let mut reader = CorpusReader::new(text.as_bytes(), "mem.jsonl");
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let err = Corpus::parse("mem.jsonl", "\n  \n").unwrap_err();
        assert!(matches!(err, CorpusError::Empty { .. }));
    }

    #[test]
    fn category_counts_are_sorted() {
        let text = concat!(
            r#"{"id":"1","question":"a","category":"pii"}"#,
            "\n",
            r#"{"id":"2","question":"b","category":"compound_words"}"#,
            "\n",
            r#"{"id":"3","question":"c","category":"pii"}"#,
        );
        let corpus = Corpus::parse("mem.jsonl", text).unwrap();
        let counts: Vec<_> = corpus.category_counts().into_iter().collect();
        assert_eq!(
            counts,
            vec![("compound_words".to_string(), 1), ("pii".to_string(), 2)]
        );
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = "{\"id\":\"T1\",\"question\":\"a\",\"category\":\"pii\"}\r\n\r\n";
        let corpus = Corpus::parse("mem.jsonl", text).unwrap();
        assert_eq!(corpus.items[0].question, "a");
    }

    #[test]
    fn invalid_utf8_names_its_line() {
        let mut bytes = br#"{"id":"T1","question":"a","category":"pii"}"#.to_vec();
        bytes.extend_from_slice(b"\n{\"id\":\"T2\",\"question\":\"\xff\xfe\",\"category\":\"pii\"}\n");
        let err = CorpusReader::new(bytes.as_slice(), "mem.jsonl")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, CorpusError::Encoding { line: 2, .. }));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let err = load_corpus(Path::new("/definitely/not/here.jsonl")).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
