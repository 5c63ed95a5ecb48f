mod criteria;
mod exercise;
mod ids;
mod knowledge;
mod library;

pub use criteria::{FilterCriteria, KnowledgeTypeFilter};
pub use exercise::{
    Correctness, DialogueResult, ExerciseRecord, ExerciseResult, ListeningResult, NumberResult,
    PracticeHistory, PracticeType, PronunciationResult, Speed, TranslationResult,
};
pub use ids::{ExerciseId, KnowledgeId, ParseIdError};
pub use knowledge::{Field, KnowledgeError, KnowledgeItem, KnowledgeType, Language};
pub use library::{DialogueError, DialoguePhrases, PromptBook, PromptEntry};
