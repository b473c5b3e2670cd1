//! Error taxonomy for norsk-eval.
//!
//! Only [`CorpusError`], [`ConfigError`] and [`ReportWriteError`] are fatal to
//! a run. [`TransportError`] and [`GradingFault`] are absorbed per pair and
//! end up as an `ERROR` verdict in the report.

use std::path::PathBuf;

/// Errors produced while loading the test corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("cannot read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid JSON: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: not valid UTF-8: {source}")]
    Encoding {
        line: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("line {line}: missing or empty required field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: duplicate test id `{id}` (first seen on line {first_line})")]
    DuplicateId {
        line: usize,
        id: String,
        first_line: usize,
    },

    #[error("corpus {path} contains no test items")]
    Empty { path: PathBuf },
}

impl CorpusError {
    /// Line number the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. }
            | Self::Encoding { line, .. }
            | Self::MissingField { line, .. }
            | Self::DuplicateId { line, .. } => Some(*line),
            Self::Io { .. } | Self::Empty { .. } => None,
        }
    }
}

/// Failures talking to the model-serving endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Per-attempt deadline of the retry policy elapsed.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The HTTP stack gave up on its own (connect or read timeout).
    #[error("HTTP request timed out: {0}")]
    HttpTimeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Client-side HTTP errors (4xx) are permanent: an unknown model id or a
    /// rejected request will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. }
            | Self::HttpTimeout(_)
            | Self::Connect(_)
            | Self::Malformed(_)
            | Self::Request(_) => true,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::HttpTimeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// A grader could not produce a verdict for its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradingFault {
    #[error("grader `{grader}` rejected input: {reason}")]
    Rejected { grader: &'static str, reason: String },

    #[error("grader `{grader}` panicked: {message}")]
    Panicked { grader: &'static str, message: String },
}

/// Failure to serialize or persist a report file.
#[derive(Debug, thiserror::Error)]
pub enum ReportWriteError {
    #[error("cannot serialize report for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportWriteError {
    /// Path that was being written.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Serialize { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// Invalid run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid model spec `{0}` (expected NAME=ID or ID)")]
    InvalidModelSpec(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
