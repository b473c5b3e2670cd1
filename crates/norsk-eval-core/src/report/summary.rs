//! Per-model and per-category verdict counts.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::domain::{EvalRun, VerdictKind};

/// Count of each verdict kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    pub unscored: usize,
}

impl VerdictCounts {
    pub fn record(&mut self, kind: VerdictKind) {
        match kind {
            VerdictKind::Pass => self.pass += 1,
            VerdictKind::Fail => self.fail += 1,
            VerdictKind::Error => self.error += 1,
            VerdictKind::Unscored => self.unscored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.error + self.unscored
    }

    /// PASS / (PASS + FAIL). `None` when nothing was graded either way.
    pub fn pass_rate(&self) -> Option<f64> {
        let graded = self.pass + self.fail;
        (graded > 0).then(|| self.pass as f64 / graded as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub counts: VerdictCounts,
    pub pass_rate: Option<f64>,
    /// Keyed by category tag, sorted.
    pub categories: BTreeMap<String, VerdictCounts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub overall: VerdictCounts,
    pub pass_rate: Option<f64>,
    /// In configured model order.
    pub models: Vec<ModelSummary>,
}

impl RunSummary {
    pub fn from_run(run: &EvalRun) -> Self {
        let mut order: Vec<String> = run
            .metadata()
            .models
            .iter()
            .map(|m| m.name.clone())
            .collect();
        let mut per_model: BTreeMap<String, (VerdictCounts, BTreeMap<String, VerdictCounts>)> =
            BTreeMap::new();
        let mut overall = VerdictCounts::default();

        for result in run.results() {
            overall.record(result.verdict.kind);
            if !order.contains(&result.model_name) {
                order.push(result.model_name.clone());
            }
            let (counts, categories) = per_model.entry(result.model_name.clone()).or_default();
            counts.record(result.verdict.kind);
            categories
                .entry(result.category.to_string())
                .or_default()
                .record(result.verdict.kind);
        }

        let models = order
            .into_iter()
            .map(|model| {
                let (counts, categories) = per_model.remove(&model).unwrap_or_default();
                ModelSummary {
                    model,
                    pass_rate: counts.pass_rate(),
                    counts,
                    categories,
                }
            })
            .collect();

        Self {
            pass_rate: overall.pass_rate(),
            overall,
            models,
        }
    }

    /// Plain-text table for the terminal.
    pub fn render_console(&self) -> String {
        let width = self
            .models
            .iter()
            .map(|m| m.model.chars().count())
            .chain(std::iter::once("TOTAL".len()))
            .max()
            .unwrap_or(5);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:>5}  {:>5}  {:>5}  {:>8}  {:>9}",
            "MODEL", "PASS", "FAIL", "ERROR", "UNSCORED", "PASS RATE"
        );
        for m in &self.models {
            write_row(&mut out, &m.model, &m.counts, width);
        }
        write_row(&mut out, "TOTAL", &self.overall, width);
        out
    }
}

fn write_row(out: &mut String, label: &str, counts: &VerdictCounts, width: usize) {
    let rate = counts
        .pass_rate()
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "{:<width$}  {:>5}  {:>5}  {:>5}  {:>8}  {:>9}",
        label, counts.pass, counts.fail, counts.error, counts.unscored, rate
    );
}
