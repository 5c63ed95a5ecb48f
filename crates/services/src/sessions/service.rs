use rand::Rng;
use std::fmt;
use tracing::{debug, info};

use lingua_core::filter::filter_candidates;
use lingua_core::model::{FilterCriteria, KnowledgeItem};
use lingua_core::verify::VerificationResult;

use super::progress::SessionProgress;
use super::selector::{ItemSelector, Selection};
use super::tracker::SessionTracker;
use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where a practice session stands.
///
/// ```text
/// Setup -> Idle -> Presented -> Verifying -> ResultShown -> Presented | Complete
/// ```
/// Changing criteria from any phase lands back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticePhase {
    /// No criteria chosen yet.
    Setup,
    /// Criteria chosen, nothing presented.
    Idle,
    Presented,
    Verifying,
    ResultShown,
    /// Every candidate has been practiced. Left on `restart`, a criteria
    /// change, or a corpus refresh that brings new candidates.
    Complete,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory practice session over the candidates of one filter criteria.
///
/// Picks unpracticed items at random, never repeating one until the learner
/// restarts or the criteria change. Nothing here survives the process.
pub struct PracticeSession {
    criteria: Option<FilterCriteria>,
    candidates: Vec<KnowledgeItem>,
    tracker: SessionTracker,
    current: Option<KnowledgeItem>,
    last_result: Option<VerificationResult>,
    phase: PracticePhase,
}

impl PracticeSession {
    /// A session waiting for the learner to choose criteria.
    #[must_use]
    pub fn setup() -> Self {
        Self {
            criteria: None,
            candidates: Vec::new(),
            tracker: SessionTracker::new(),
            current: None,
            last_result: None,
            phase: PracticePhase::Setup,
        }
    }

    /// Start a session over the items of `corpus` matching `criteria`.
    #[must_use]
    pub fn new(criteria: FilterCriteria, corpus: &[KnowledgeItem]) -> Self {
        let mut session = Self::setup();
        session.apply_criteria(criteria, corpus);
        session
    }

    fn apply_criteria(&mut self, criteria: FilterCriteria, corpus: &[KnowledgeItem]) {
        self.candidates = filter_candidates(corpus, &criteria);
        self.criteria = Some(criteria);
        self.tracker.reset();
        self.current = None;
        self.last_result = None;
        self.phase = PracticePhase::Idle;
        debug!(%criteria, candidates = self.candidates.len(), "practice session reset");
    }

    /// Switch to new criteria, discarding practiced state and any in-flight attempt.
    ///
    /// Returns `false` (and keeps everything) when the criteria are unchanged.
    pub fn change_criteria(&mut self, criteria: FilterCriteria, corpus: &[KnowledgeItem]) -> bool {
        if self.criteria == Some(criteria) {
            return false;
        }
        self.apply_criteria(criteria, corpus);
        true
    }

    /// Re-derive candidates from a refreshed corpus without touching criteria.
    ///
    /// Practiced ids that vanished from the corpus are forgotten. A current
    /// item that vanished is withdrawn along with any verification in flight.
    /// A completed session reopens when new candidates appeared.
    pub fn refresh_corpus(&mut self, corpus: &[KnowledgeItem]) {
        let Some(criteria) = self.criteria else {
            return;
        };
        self.candidates = filter_candidates(corpus, &criteria);
        self.tracker.retain_candidates(&self.candidates);

        let current_gone = self
            .current
            .as_ref()
            .is_some_and(|current| !self.candidates.iter().any(|c| c.id() == current.id()));
        if current_gone {
            debug!(phase = ?self.phase, "current item left the corpus");
            self.current = None;
            self.last_result = None;
            self.phase = PracticePhase::Idle;
        }

        if self.phase == PracticePhase::Complete
            && !self.tracker.unpracticed(&self.candidates).is_empty()
        {
            debug!(candidates = self.candidates.len(), "new items reopen the session");
            self.phase = PracticePhase::Idle;
        }
    }

    /// Forget every practiced item and start over under the same criteria.
    pub fn restart(&mut self) {
        self.tracker.reset();
        self.current = None;
        self.last_result = None;
        self.phase = if self.criteria.is_some() {
            PracticePhase::Idle
        } else {
            PracticePhase::Setup
        };
    }

    #[must_use]
    pub fn criteria(&self) -> Option<FilterCriteria> {
        self.criteria
    }

    #[must_use]
    pub fn phase(&self) -> PracticePhase {
        self.phase
    }

    #[must_use]
    pub fn candidates(&self) -> &[KnowledgeItem] {
        &self.candidates
    }

    /// `false` when the criteria match nothing ("nothing found").
    #[must_use]
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&KnowledgeItem> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&VerificationResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == PracticePhase::Complete
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::from_coverage(self.tracker.coverage(&self.candidates), self.is_complete())
    }

    /// Present a random unpracticed item, or complete the session when none is left.
    ///
    /// Returns `Ok(None)` once the session is complete.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCriteria` during setup, `ItemPending` while an
    /// item awaits an answer, and `VerificationInFlight` while verifying.
    pub fn present_next<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<&KnowledgeItem>, SessionError> {
        match self.phase {
            PracticePhase::Setup => return Err(SessionError::NoCriteria),
            PracticePhase::Presented => return Err(SessionError::ItemPending),
            PracticePhase::Verifying => return Err(SessionError::VerificationInFlight),
            PracticePhase::Complete => return Ok(None),
            PracticePhase::Idle | PracticePhase::ResultShown => {}
        }

        let unpracticed = self.tracker.unpracticed(&self.candidates);
        match ItemSelector::select_next(rng, &unpracticed) {
            Selection::Item(item) => {
                debug!(id = %item.id(), left = unpracticed.len(), "presenting item");
                self.current = Some(item.clone());
                self.last_result = None;
                self.phase = PracticePhase::Presented;
                Ok(self.current.as_ref())
            }
            Selection::Exhausted => {
                info!(total = self.candidates.len(), "all items practiced");
                self.current = None;
                self.last_result = None;
                self.phase = PracticePhase::Complete;
                Ok(None)
            }
        }
    }

    /// Take back the presented item without practicing it.
    ///
    /// Used when preparing the item failed (e.g. its audio could not be generated).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoItem` unless an item is presented.
    pub fn withdraw_current(&mut self) -> Result<(), SessionError> {
        if self.phase != PracticePhase::Presented {
            return Err(SessionError::NoItem);
        }
        self.current = None;
        self.phase = PracticePhase::Idle;
        Ok(())
    }

    /// Lock the presented item for checking. Only one check may run at a time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::VerificationInFlight` if a check is already
    /// running, `Completed` after completion, and `NoItem` otherwise.
    pub fn begin_verification(&mut self) -> Result<KnowledgeItem, SessionError> {
        match self.phase {
            PracticePhase::Presented => {}
            PracticePhase::Verifying => return Err(SessionError::VerificationInFlight),
            PracticePhase::Complete => return Err(SessionError::Completed),
            _ => return Err(SessionError::NoItem),
        }
        let item = self.current.clone().ok_or(SessionError::NoItem)?;
        self.phase = PracticePhase::Verifying;
        Ok(item)
    }

    /// Return to the presented item after a failed check so the learner can retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotVerifying` outside a verification.
    pub fn abort_verification(&mut self) -> Result<(), SessionError> {
        if self.phase != PracticePhase::Verifying {
            return Err(SessionError::NotVerifying);
        }
        self.phase = PracticePhase::Presented;
        Ok(())
    }

    /// Store the verdict and count the current item as practiced.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotVerifying` outside a verification.
    pub fn finish_verification(
        &mut self,
        result: VerificationResult,
    ) -> Result<&VerificationResult, SessionError> {
        if self.phase != PracticePhase::Verifying {
            return Err(SessionError::NotVerifying);
        }
        let item = self.current.as_ref().ok_or(SessionError::NoItem)?;
        if self.candidates.iter().any(|c| c.id() == item.id()) {
            self.tracker.mark_practiced(item.id().clone());
        }
        self.phase = PracticePhase::ResultShown;
        Ok(self.last_result.insert(result))
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("criteria", &self.criteria)
            .field("candidates_len", &self.candidates.len())
            .field("practiced", &self.tracker.len())
            .field("current", &self.current.as_ref().map(KnowledgeItem::id))
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{KnowledgeId, KnowledgeType, Language};
    use lingua_core::time::fixed_now;
    use lingua_core::verify::verify_exact;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn item(id: &str, language: Language, knowledge_type: KnowledgeType) -> KnowledgeItem {
        KnowledgeItem::new(
            KnowledgeId::new(id),
            language,
            knowledge_type,
            format!("text {id}"),
            format!("translation {id}"),
            fixed_now(),
        )
        .unwrap()
    }

    fn corpus() -> Vec<KnowledgeItem> {
        vec![
            item("de-1", Language::German, KnowledgeType::Word),
            item("de-2", Language::German, KnowledgeType::Phrase),
            item("de-3", Language::German, KnowledgeType::Word),
            item("en-1", Language::English, KnowledgeType::Word),
        ]
    }

    fn answer(session: &mut PracticeSession) {
        let item = session.begin_verification().unwrap();
        let result = verify_exact(item.translation(), item.translation());
        session.finish_verification(result).unwrap();
    }

    #[test]
    fn presents_without_repeats_until_complete() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus());
        let mut seen = HashSet::new();

        while let Some(item) = session.present_next(&mut rng).unwrap() {
            assert!(seen.insert(item.id().clone()), "item repeated");
            answer(&mut session);
        }

        assert_eq!(seen.len(), 3);
        assert!(session.is_complete());
        assert_eq!(session.progress().remaining, 0);
        assert_eq!(session.progress().practiced, 3);
    }

    #[test]
    fn complete_requires_a_selection_attempt() {
        let mut rng = StdRng::seed_from_u64(3);
        let single = vec![item("only", Language::German, KnowledgeType::Word)];
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &single);
        session.present_next(&mut rng).unwrap();
        answer(&mut session);

        assert_eq!(session.progress().remaining, 0);
        assert!(!session.is_complete());
        assert!(session.present_next(&mut rng).unwrap().is_none());
        assert!(session.is_complete());
    }

    #[test]
    fn empty_candidates_complete_on_first_attempt() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = PracticeSession::new(
            FilterCriteria::new(Language::English, KnowledgeType::Phrase),
            &corpus(),
        );
        assert!(!session.has_candidates());
        assert!(session.present_next(&mut rng).unwrap().is_none());
        assert!(session.is_complete());
    }

    #[test]
    fn second_verification_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus());
        session.present_next(&mut rng).unwrap();
        session.begin_verification().unwrap();
        assert!(matches!(
            session.begin_verification(),
            Err(SessionError::VerificationInFlight)
        ));
        assert!(matches!(
            session.present_next(&mut rng),
            Err(SessionError::VerificationInFlight)
        ));
    }

    #[test]
    fn aborted_verification_leaves_item_unpracticed() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus());
        session.present_next(&mut rng).unwrap();
        session.begin_verification().unwrap();
        session.abort_verification().unwrap();

        assert_eq!(session.phase(), PracticePhase::Presented);
        assert_eq!(session.progress().practiced, 0);
        assert!(session.begin_verification().is_ok());
    }

    #[test]
    fn changing_criteria_discards_progress() {
        let mut rng = StdRng::seed_from_u64(5);
        let corpus = corpus();
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus);
        session.present_next(&mut rng).unwrap();
        answer(&mut session);
        session.present_next(&mut rng).unwrap();
        session.begin_verification().unwrap();

        assert!(session.change_criteria(
            FilterCriteria::new(Language::German, KnowledgeType::Word),
            &corpus
        ));
        assert_eq!(session.phase(), PracticePhase::Idle);
        assert!(session.current_item().is_none());
        assert_eq!(session.progress().practiced, 0);
        assert_eq!(session.progress().total, 2);
    }

    #[test]
    fn same_criteria_do_not_reset() {
        let mut rng = StdRng::seed_from_u64(5);
        let corpus = corpus();
        let criteria = FilterCriteria::all_of(Language::German);
        let mut session = PracticeSession::new(criteria, &corpus);
        session.present_next(&mut rng).unwrap();
        answer(&mut session);

        assert!(!session.change_criteria(criteria, &corpus));
        assert_eq!(session.progress().practiced, 1);
        assert_eq!(session.phase(), PracticePhase::ResultShown);
    }

    #[test]
    fn restart_after_completion_starts_over() {
        let mut rng = StdRng::seed_from_u64(9);
        let criteria = FilterCriteria::all_of(Language::English);
        let mut session = PracticeSession::new(criteria, &corpus());
        session.present_next(&mut rng).unwrap();
        answer(&mut session);
        assert!(session.present_next(&mut rng).unwrap().is_none());

        session.restart();
        assert_eq!(session.phase(), PracticePhase::Idle);
        assert!(session.present_next(&mut rng).unwrap().is_some());
    }

    #[test]
    fn setup_session_needs_criteria() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = PracticeSession::setup();
        assert!(matches!(
            session.present_next(&mut rng),
            Err(SessionError::NoCriteria)
        ));
        session.change_criteria(FilterCriteria::all_of(Language::German), &corpus());
        assert!(session.present_next(&mut rng).unwrap().is_some());
    }

    #[test]
    fn refreshed_corpus_forgets_removed_items() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut corpus = corpus();
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus);
        while session.progress().practiced < 3 {
            session.present_next(&mut rng).unwrap();
            answer(&mut session);
        }

        corpus.retain(|item| item.id().as_str() != "de-2");
        corpus.push(item("de-4", Language::German, KnowledgeType::Phrase));
        session.refresh_corpus(&corpus);

        assert_eq!(session.progress().total, 3);
        assert_eq!(session.progress().practiced, 2);
        assert_eq!(
            session.present_next(&mut rng).unwrap().map(|i| i.id().as_str()),
            Some("de-4")
        );
    }

    fn pair() -> Vec<KnowledgeItem> {
        vec![
            item("a", Language::German, KnowledgeType::Word),
            item("b", Language::German, KnowledgeType::Word),
        ]
    }

    #[test]
    fn refresh_withdraws_a_vanished_item_under_verification() {
        let mut rng = StdRng::seed_from_u64(4);
        let corpus = pair();
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus);
        let presented = session.present_next(&mut rng).unwrap().unwrap().id().clone();
        session.begin_verification().unwrap();

        let remaining: Vec<_> = corpus.into_iter().filter(|i| *i.id() != presented).collect();
        session.refresh_corpus(&remaining);

        assert_eq!(session.phase(), PracticePhase::Idle);
        assert!(session.current_item().is_none());
        let result = verify_exact("x", "x");
        assert!(matches!(
            session.finish_verification(result),
            Err(SessionError::NotVerifying)
        ));
        assert!(session.tracker().is_empty());
        assert_eq!(session.progress().total, 1);
    }

    #[test]
    fn practiced_ids_stay_within_candidates() {
        let mut rng = StdRng::seed_from_u64(4);
        let corpus = pair();
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus);
        let presented = session.present_next(&mut rng).unwrap().unwrap().id().clone();

        let remaining: Vec<_> = corpus.into_iter().filter(|i| *i.id() != presented).collect();
        session.refresh_corpus(&remaining);

        assert!(matches!(session.begin_verification(), Err(SessionError::NoItem)));
        let next = session.present_next(&mut rng).unwrap().unwrap().id().clone();
        assert_ne!(next, presented);
        answer(&mut session);
        assert!(!session.tracker().is_practiced(&presented));
        assert_eq!(session.tracker().len(), session.progress().practiced);
    }

    #[test]
    fn refresh_with_new_items_reopens_a_completed_session() {
        let mut rng = StdRng::seed_from_u64(7);
        let corpus = pair();
        let criteria = FilterCriteria::all_of(Language::German);
        let mut session = PracticeSession::new(criteria, &corpus[..1]);
        session.present_next(&mut rng).unwrap();
        answer(&mut session);
        assert!(session.present_next(&mut rng).unwrap().is_none());
        assert!(session.is_complete());

        session.refresh_corpus(&corpus);

        assert!(!session.is_complete());
        assert_eq!(session.phase(), PracticePhase::Idle);
        assert_eq!(session.progress().remaining, 1);
        assert_eq!(
            session.present_next(&mut rng).unwrap().map(|i| i.id().as_str()),
            Some("b")
        );
    }

    #[test]
    fn refresh_leaving_nothing_unpracticed_completes_on_next_selection() {
        let mut rng = StdRng::seed_from_u64(7);
        let corpus = pair();
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &corpus);
        let first = session.present_next(&mut rng).unwrap().unwrap().id().clone();
        answer(&mut session);
        let second = session.present_next(&mut rng).unwrap().unwrap().id().clone();
        assert_ne!(first, second);

        let kept: Vec<_> = corpus.into_iter().filter(|i| *i.id() == first).collect();
        session.refresh_corpus(&kept);

        assert_eq!(session.phase(), PracticePhase::Idle);
        assert!(!session.is_complete());
        assert!(session.present_next(&mut rng).unwrap().is_none());
        assert!(session.is_complete());
        assert_eq!(session.progress().practiced, 1);
    }

    #[test]
    fn withdrawn_item_can_be_presented_again() {
        let mut rng = StdRng::seed_from_u64(2);
        let single = vec![item("only", Language::German, KnowledgeType::Word)];
        let mut session = PracticeSession::new(FilterCriteria::all_of(Language::German), &single);
        session.present_next(&mut rng).unwrap();
        session.withdraw_current().unwrap();
        assert_eq!(session.phase(), PracticePhase::Idle);
        assert_eq!(
            session.present_next(&mut rng).unwrap().map(|i| i.id().as_str()),
            Some("only")
        );
    }
}
