use std::sync::Arc;

use tracing::{debug, warn};

use lingua_core::Clock;
use lingua_core::model::{ExerciseRecord, ExerciseResult, KnowledgeId, Language, PracticeType};
use storage::repository::HistoryRepository;

/// What happened to a submitted exercise record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// The history store rejected or never received the record. It is not retried.
    Dropped,
}

impl RecordOutcome {
    #[must_use]
    pub fn is_stored(self) -> bool {
        matches!(self, RecordOutcome::Stored)
    }
}

/// Builds exercise records and submits them to the history store, best effort.
#[derive(Clone)]
pub struct ExerciseRecorder {
    clock: Clock,
    history: Arc<dyn HistoryRepository>,
}

impl ExerciseRecorder {
    #[must_use]
    pub fn new(history: Arc<dyn HistoryRepository>) -> Self {
        Self {
            clock: Clock::default(),
            history,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Stamp a new record with the current time and a fresh exercise id.
    #[must_use]
    pub fn record(
        &self,
        knowledge_item_id: KnowledgeId,
        language: Language,
        practice_type: PracticeType,
        result: ExerciseResult,
    ) -> ExerciseRecord {
        ExerciseRecord::new(
            self.clock.now(),
            knowledge_item_id,
            language,
            practice_type,
            result,
        )
    }

    /// Send one record. Failures are logged and reported, never raised.
    pub async fn submit(&self, record: &ExerciseRecord) -> RecordOutcome {
        match self.history.append_exercise(record).await {
            Ok(()) => {
                debug!(
                    exercise = %record.exercise_id,
                    item = %record.knowledge_item_id,
                    practice = %record.practice_type,
                    "exercise recorded"
                );
                RecordOutcome::Stored
            }
            Err(err) => {
                warn!(
                    exercise = %record.exercise_id,
                    item = %record.knowledge_item_id,
                    error = %err,
                    "failed to record exercise"
                );
                RecordOutcome::Dropped
            }
        }
    }

    pub async fn record_and_submit(
        &self,
        knowledge_item_id: KnowledgeId,
        language: Language,
        practice_type: PracticeType,
        result: ExerciseResult,
    ) -> (ExerciseRecord, RecordOutcome) {
        let record = self.record(knowledge_item_id, language, practice_type, result);
        let outcome = self.submit(&record).await;
        (record, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{Correctness, DialogueResult};
    use lingua_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;

    fn dialogue() -> ExerciseResult {
        ExerciseResult::Dialogue(DialogueResult {
            correct: Correctness::Partial,
        })
    }

    #[test]
    fn records_use_the_injected_clock() {
        let recorder =
            ExerciseRecorder::new(Arc::new(InMemoryRepository::new())).with_clock(fixed_clock());
        let record = || {
            let id = KnowledgeId::new("k");
            recorder.record(id, Language::German, PracticeType::Dialogue, dialogue())
        };
        let a = record();
        let b = record();
        assert_eq!(a.timestamp, fixed_now());
        assert_ne!(a.exercise_id, b.exercise_id);
    }

    #[tokio::test]
    async fn stored_records_reach_history() {
        let repo = InMemoryRepository::new();
        let recorder = ExerciseRecorder::new(Arc::new(repo.clone())).with_clock(fixed_clock());
        let (_, outcome) = recorder
            .record_and_submit(
                KnowledgeId::new("k"),
                Language::English,
                PracticeType::Dialogue,
                dialogue(),
            )
            .await;
        assert!(outcome.is_stored());
        assert_eq!(repo.exercise_count(), 1);
    }

    #[tokio::test]
    async fn failed_append_is_dropped_not_raised() {
        let repo = InMemoryRepository::new();
        repo.fail_appends(true);
        let recorder = ExerciseRecorder::new(Arc::new(repo.clone()));
        let (_, outcome) = recorder
            .record_and_submit(
                KnowledgeId::new("k"),
                Language::English,
                PracticeType::Dialogue,
                dialogue(),
            )
            .await;
        assert_eq!(outcome, RecordOutcome::Dropped);
        assert_eq!(repo.exercise_count(), 0);
    }
}
