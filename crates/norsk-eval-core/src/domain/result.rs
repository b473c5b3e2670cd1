//! Responses, verdicts and the run record they accumulate into.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::Category;
use super::model::ModelTarget;

/// What the serving endpoint returned for one (item, model) pair.
///
/// Created exactly once per attempted pair. Transport failures are data:
/// `error` is set and `text` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub test_id: String,
    pub model_name: String,
    pub text: String,
    /// Wall time of the final attempt in milliseconds.
    pub latency_ms: u64,
    /// Number of attempts made (1 = no retries used).
    pub attempts: u32,
    pub error: Option<String>,
}

impl RawResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Graded outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    Pass,
    Fail,
    Error,
    Unscored,
}

impl VerdictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
            Self::Unscored => "UNSCORED",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict plus optional free-text rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub rationale: Option<String>,
}

impl Verdict {
    pub fn pass(rationale: impl Into<String>) -> Self {
        Self::with(VerdictKind::Pass, rationale)
    }

    pub fn fail(rationale: impl Into<String>) -> Self {
        Self::with(VerdictKind::Fail, rationale)
    }

    pub fn error(rationale: impl Into<String>) -> Self {
        Self::with(VerdictKind::Error, rationale)
    }

    pub fn unscored(rationale: impl Into<String>) -> Self {
        Self::with(VerdictKind::Unscored, rationale)
    }

    fn with(kind: VerdictKind, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        Self {
            kind,
            rationale: (!rationale.is_empty()).then_some(rationale),
        }
    }
}

/// Record of one (item, model) attempt. The atomic unit of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    pub test_id: String,
    pub model_name: String,
    pub category: Category,
    /// Prompt sent to the model, copied from the test item.
    pub question: String,
    pub raw_response: RawResponse,
    pub verdict: Verdict,
    pub timestamp: DateTime<Utc>,
}

/// Where the corpus came from, for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSource {
    pub path: PathBuf,
    /// SHA-256 hex digest of the corpus file bytes.
    pub sha256: String,
    pub items: usize,
}

/// Run-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub endpoint: String,
    pub models: Vec<ModelTarget>,
    pub corpus: CorpusSource,
    /// Pairs actually started. Equals items × models unless cancelled.
    pub scheduled_pairs: usize,
    pub cancelled: bool,
}

/// Append-only collector used while a run is executing.
///
/// Results may arrive out of order; each carries the ordinal of its pair so
/// [`EvalRunBuilder::freeze`] can restore submission order.
#[derive(Debug)]
pub struct EvalRunBuilder {
    metadata: RunMetadata,
    results: Vec<(usize, EvalResult)>,
}

impl EvalRunBuilder {
    pub fn new(endpoint: impl Into<String>, models: Vec<ModelTarget>, corpus: CorpusSource) -> Self {
        Self {
            metadata: RunMetadata {
                run_id: Uuid::new_v4(),
                tool_version: crate::VERSION.to_string(),
                started_at: Utc::now(),
                finished_at: None,
                endpoint: endpoint.into(),
                models,
                corpus,
                scheduled_pairs: 0,
                cancelled: false,
            },
            results: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.metadata.run_id
    }

    /// Record that one more pair was started.
    pub fn mark_scheduled(&mut self) {
        self.metadata.scheduled_pairs += 1;
    }

    pub fn scheduled(&self) -> usize {
        self.metadata.scheduled_pairs
    }

    pub fn mark_cancelled(&mut self) {
        self.metadata.cancelled = true;
    }

    pub fn append(&mut self, ordinal: usize, result: EvalResult) {
        self.results.push((ordinal, result));
    }

    /// Freeze the run: stamp `finished_at` and sort results by pair ordinal.
    pub fn freeze(mut self) -> EvalRun {
        self.results.sort_by_key(|(ordinal, _)| *ordinal);
        self.metadata.finished_at = Some(Utc::now());
        EvalRun {
            metadata: self.metadata,
            results: self.results.into_iter().map(|(_, r)| r).collect(),
        }
    }
}

/// A frozen run: metadata plus results in deterministic pair order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRun {
    metadata: RunMetadata,
    results: Vec<EvalResult>,
}

impl EvalRun {
    /// Rebuild a frozen run from parts (e.g. a report read back from disk).
    pub fn from_parts(metadata: RunMetadata, results: Vec<EvalResult>) -> Self {
        Self { metadata, results }
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn results(&self) -> &[EvalResult] {
        &self.results
    }

    pub fn run_id(&self) -> Uuid {
        self.metadata.run_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.metadata.cancelled
    }

    pub fn count(&self, kind: VerdictKind) -> usize {
        self.results.iter().filter(|r| r.verdict.kind == kind).count()
    }
}
