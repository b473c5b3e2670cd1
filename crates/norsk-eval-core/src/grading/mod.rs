//! Category grader registry.
//!
//! Maps a [`Category`] to a [`Grader`]: a pure, stateless function of
//! `(question, response text) -> Verdict`. The registry is closed: new
//! categories get a grader by registering an implementation, never by
//! string-keyed dispatch.
//!
//! Grading rules, in order:
//! 1. transport error on the response ⇒ `ERROR` (grader not consulted)
//! 2. no grader registered for the category ⇒ `UNSCORED`
//! 3. otherwise the grader's verdict; a grader that returns an error or
//!    panics yields a [`GradingFault`]

pub mod compound;
pub mod offensive;
pub mod pii;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::domain::{Category, GradingFault, RawResponse, Verdict};

pub use compound::CompoundWordGrader;
pub use offensive::OffensiveLanguageGrader;
pub use pii::PiiGrader;

/// Heuristic for one category.
///
/// Implementations must be deterministic and side-effect-free so a verdict
/// can be reproduced from the stored response.
pub trait Grader: Send + Sync {
    fn name(&self) -> &'static str;

    fn grade(&self, question: &str, text: &str) -> Result<Verdict, GradingFault>;
}

/// Closed mapping from category to grader.
#[derive(Clone, Default)]
pub struct GraderRegistry {
    graders: HashMap<Category, Arc<dyn Grader>>,
}

impl GraderRegistry {
    /// Registry with no graders: every category grades `UNSCORED`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in graders.
    pub fn standard() -> Self {
        Self::empty()
            .register(Category::CompoundWords, CompoundWordGrader)
            .register(Category::OffensiveLanguage, OffensiveLanguageGrader)
            .register(Category::Pii, PiiGrader)
    }

    /// Register (or replace) the grader for `category`.
    pub fn register(mut self, category: Category, grader: impl Grader + 'static) -> Self {
        self.graders.insert(category, Arc::new(grader));
        self
    }

    pub fn get(&self, category: &Category) -> Option<&Arc<dyn Grader>> {
        self.graders.get(category)
    }

    /// Categories with a registered grader, sorted.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.graders.keys().cloned().collect();
        categories.sort();
        categories
    }

    /// Grade one response.
    pub fn grade(
        &self,
        category: &Category,
        question: &str,
        response: &RawResponse,
    ) -> Result<Verdict, GradingFault> {
        if let Some(err) = &response.error {
            return Ok(Verdict::error(format!("transport: {err}")));
        }

        let Some(grader) = self.graders.get(category) else {
            return Ok(Verdict::unscored(format!(
                "no grader registered for category `{category}`"
            )));
        };

        match catch_unwind(AssertUnwindSafe(|| grader.grade(question, &response.text))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(GradingFault::Panicked {
                grader: grader.name(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl std::fmt::Debug for GraderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for category in self.categories() {
            if let Some(grader) = self.graders.get(&category) {
                map.entry(&category.to_string(), &grader.name());
            }
        }
        map.finish()
    }
}

/// Compile a built-in pattern once per process.
pub(crate) fn builtin(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in grader pattern is valid"))
}

/// Text of a panic payload (`&str` or `String`).
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
