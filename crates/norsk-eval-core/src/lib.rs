//! norsk-eval core library
//!
//! Batch evaluation of locally served language models on Norwegian-specific
//! failure axes: load a JSONL corpus, run every (item, model) pair through
//! the serving endpoint, grade each response by category, and write a
//! structured and a tabular report.

pub mod client;
pub mod config;
pub mod corpus;
pub mod domain;
pub mod grading;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod report;
pub mod telemetry;

/// Version recorded in every run's metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::fakes::{ScriptStep, ScriptedModelClient};
pub use client::{GenerationOptions, ModelAdapter, ModelClient, OllamaClient, RetryPolicy};
pub use config::{ConfigOverrides, EvalConfig};
pub use corpus::{load_corpus, Corpus, CorpusReader};
pub use domain::{
    Category, ConfigError, CorpusError, CorpusSource, EvalResult, EvalRun, EvalRunBuilder,
    GradingFault, ModelGroup, ModelTarget, PresetSelection, RawResponse, ReportWriteError,
    RunMetadata, TestItem, TransportError, Verdict, VerdictKind,
};
pub use grading::{Grader, GraderRegistry};
pub use metrics::METRICS;
pub use orchestrator::Orchestrator;
pub use report::{write_reports, ReportPaths, RunSummary, WrittenReport};
pub use telemetry::init_tracing;
