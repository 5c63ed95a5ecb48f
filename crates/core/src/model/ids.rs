use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a knowledge item.
///
/// The backend hands these out as UUID strings, but number practice uses
/// synthetic ids such as `numero_42`, so the value stays opaque.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeId(String);

impl KnowledgeId {
    /// Creates a new `KnowledgeId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Synthetic id used when practicing a number outside the corpus.
    #[must_use]
    pub fn for_number(number: i64) -> Self {
        Self(format!("numero_{number}"))
    }

    /// Synthetic id shared by every dialogue practice record.
    #[must_use]
    pub fn dialogue() -> Self {
        Self("dialogo_practice".to_string())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique identifier of one recorded exercise attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseId(Uuid);

impl ExerciseId {
    /// Creates a fresh random (v4) `ExerciseId`
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID
    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for KnowledgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KnowledgeId({})", self.0)
    }
}

impl fmt::Debug for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExerciseId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for KnowledgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KnowledgeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for KnowledgeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                kind: "KnowledgeId".to_string(),
            });
        }
        Ok(Self::new(trimmed))
    }
}

impl FromStr for ExerciseId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Uuid>()
            .map(ExerciseId::from_uuid)
            .map_err(|_| ParseIdError {
                kind: "ExerciseId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knowledge_id_display() {
        let id = KnowledgeId::new("a1b2");
        assert_eq!(id.to_string(), "a1b2");
    }

    #[test]
    fn test_knowledge_id_from_str_rejects_blank() {
        assert!("   ".parse::<KnowledgeId>().is_err());
        let id: KnowledgeId = " abc ".parse().unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_number_id_uses_backend_prefix() {
        assert_eq!(KnowledgeId::for_number(42).as_str(), "numero_42");
        assert_eq!(KnowledgeId::dialogue().as_str(), "dialogo_practice");
    }

    #[test]
    fn test_exercise_ids_are_fresh() {
        assert_ne!(ExerciseId::random(), ExerciseId::random());
    }

    #[test]
    fn test_exercise_id_from_str_invalid() {
        assert!("not-a-uuid".parse::<ExerciseId>().is_err());
    }

    #[test]
    fn test_knowledge_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&KnowledgeId::new("k-1")).unwrap();
        assert_eq!(json, "\"k-1\"");
    }
}
