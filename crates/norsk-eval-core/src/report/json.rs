//! Structured JSON report: run metadata, summary and every result.

use serde::{Deserialize, Serialize};

use super::summary::RunSummary;
use crate::domain::{EvalResult, EvalRun, RunMetadata};

/// Bumped on any incompatible change to the document layout.
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Serialize)]
struct ReportDocument<'a> {
    schema_version: &'static str,
    run: &'a RunMetadata,
    summary: RunSummary,
    results: &'a [EvalResult],
}

#[derive(Deserialize)]
struct StoredDocument {
    schema_version: String,
    run: RunMetadata,
    results: Vec<EvalResult>,
}

/// Pretty-printed JSON document, newline-terminated.
///
/// Pure function of `run`: rendering the same frozen run twice gives
/// byte-identical output.
pub fn render_json(run: &EvalRun) -> Result<String, serde_json::Error> {
    let document = ReportDocument {
        schema_version: SCHEMA_VERSION,
        run: run.metadata(),
        summary: RunSummary::from_run(run),
        results: run.results(),
    };
    let mut out = serde_json::to_string_pretty(&document)?;
    out.push('\n');
    Ok(out)
}

/// Rebuild a frozen run from a stored report. The summary is recomputed,
/// not read.
pub fn parse_json(text: &str) -> Result<EvalRun, serde_json::Error> {
    let stored: StoredDocument = serde_json::from_str(text)?;
    if stored.schema_version != SCHEMA_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported schema_version `{}` (expected `{SCHEMA_VERSION}`)",
            stored.schema_version
        )));
    }
    Ok(EvalRun::from_parts(stored.run, stored.results))
}
