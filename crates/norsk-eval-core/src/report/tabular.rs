//! Flat tab-separated table, one row per result, for spreadsheets.

use chrono::SecondsFormat;

use crate::domain::{EvalResult, EvalRun};

pub const COLUMNS: [&str; 9] = [
    "test_id",
    "model",
    "category",
    "question",
    "verdict",
    "detail",
    "latency_ms",
    "response_excerpt",
    "timestamp",
];

/// Maximum characters of response text kept in a row.
pub const EXCERPT_CHARS: usize = 500;

/// Render the run as TSV: a header row, then results in run order.
pub fn render_tsv(run: &EvalRun) -> String {
    let mut out = COLUMNS.join("\t");
    out.push('\n');
    for result in run.results() {
        out.push_str(&row(result).join("\t"));
        out.push('\n');
    }
    out
}

fn row(result: &EvalResult) -> [String; 9] {
    let detail = result
        .verdict
        .rationale
        .as_deref()
        .or(result.raw_response.error.as_deref())
        .unwrap_or_default();

    [
        cell(&result.test_id),
        cell(&result.model_name),
        cell(result.category.as_str()),
        cell(&result.question),
        result.verdict.kind.to_string(),
        cell(detail),
        result.raw_response.latency_ms.to_string(),
        cell(&excerpt(&result.raw_response.text)),
        result
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
}

/// Replace characters that would break the row structure.
fn cell(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
