//! Test items and their category tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category tag attached to every test item.
///
/// Tags outside the known set are kept verbatim in [`Category::Other`] so the
/// report still groups them; they are never silently rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Real or invented Norwegian compound words.
    CompoundWords,
    /// Slurs and other flagged terms.
    OffensiveLanguage,
    /// Personal data such as national identity numbers.
    Pii,
    /// Norwegian cultural and historical knowledge.
    CulturalKnowledge,
    /// Uncategorised general questions.
    General,
    /// Any other tag.
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CompoundWords => "compound_words",
            Self::OffensiveLanguage => "offensive_language",
            Self::Pii => "pii",
            Self::CulturalKnowledge => "cultural_knowledge",
            Self::General => "general",
            Self::Other(tag) => tag,
        }
    }

    /// Whether the tag is one of the enumerated categories.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "compound_words" => Self::CompoundWords,
            "offensive_language" => Self::OffensiveLanguage,
            "pii" => Self::Pii,
            "cultural_knowledge" => Self::CulturalKnowledge,
            "general" => Self::General,
            _ => Self::Other(tag),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluation question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestItem {
    pub id: String,
    pub question: String,
    pub category: Category,
}

impl TestItem {
    pub fn new(id: impl Into<String>, question: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            category,
        }
    }
}
