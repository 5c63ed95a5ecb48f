use std::fmt;
use std::str::FromStr;

use crate::model::knowledge::{KnowledgeError, KnowledgeItem, KnowledgeType, Language};

/// Knowledge-type half of the filter; `All` matches every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KnowledgeTypeFilter {
    #[default]
    All,
    Only(KnowledgeType),
}

impl KnowledgeTypeFilter {
    #[must_use]
    pub fn matches(self, knowledge_type: KnowledgeType) -> bool {
        match self {
            KnowledgeTypeFilter::All => true,
            KnowledgeTypeFilter::Only(wanted) => wanted == knowledge_type,
        }
    }
}

impl fmt::Display for KnowledgeTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeTypeFilter::All => f.write_str("all"),
            KnowledgeTypeFilter::Only(t) => t.fmt(f),
        }
    }
}

impl FromStr for KnowledgeTypeFilter {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "todos" => Ok(KnowledgeTypeFilter::All),
            other => other.parse().map(KnowledgeTypeFilter::Only),
        }
    }
}

impl From<KnowledgeType> for KnowledgeTypeFilter {
    fn from(value: KnowledgeType) -> Self {
        KnowledgeTypeFilter::Only(value)
    }
}

/// The (language, knowledge type) pair narrowing the corpus for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub language: Language,
    pub knowledge_type: KnowledgeTypeFilter,
}

impl FilterCriteria {
    #[must_use]
    pub fn new(language: Language, knowledge_type: impl Into<KnowledgeTypeFilter>) -> Self {
        Self {
            language,
            knowledge_type: knowledge_type.into(),
        }
    }

    /// Criteria matching every type of the given language.
    #[must_use]
    pub fn all_of(language: Language) -> Self {
        Self::new(language, KnowledgeTypeFilter::All)
    }

    #[must_use]
    pub fn matches(&self, item: &KnowledgeItem) -> bool {
        item.language() == self.language && self.knowledge_type.matches(item.knowledge_type())
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.language, self.knowledge_type)
    }
}
