//! Domain models for norsk-eval.
//!
//! Canonical definitions for the core entities:
//! - `TestItem`: one question with its category tag
//! - `ModelTarget`: one model under evaluation
//! - `RawResponse` / `Verdict` / `EvalResult`: per-pair outcome
//! - `EvalRun`: the frozen collection of results from one invocation

pub mod error;
pub mod item;
pub mod model;
pub mod result;

// Re-export main types and errors
pub use error::{
    ConfigError, CorpusError, GradingFault, ReportWriteError, TransportError,
};
pub use item::{Category, TestItem};
pub use model::{
    international_models, norwegian_models, ModelGroup, ModelTarget, PresetSelection,
};
pub use result::{
    CorpusSource, EvalResult, EvalRun, EvalRunBuilder, RawResponse, RunMetadata, Verdict,
    VerdictKind,
};
