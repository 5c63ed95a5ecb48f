use std::collections::HashSet;

use lingua_core::model::{KnowledgeId, KnowledgeItem};

/// Ids already practiced under the current filter criteria.
///
/// Lives only as long as one criteria value; the owning session resets it
/// when the criteria change or the learner restarts.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    practiced: HashSet<KnowledgeId>,
}

impl SessionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.practiced.clear();
    }

    /// Returns `false` if the id was already tracked.
    pub fn mark_practiced(&mut self, id: KnowledgeId) -> bool {
        self.practiced.insert(id)
    }

    #[must_use]
    pub fn is_practiced(&self, id: &KnowledgeId) -> bool {
        self.practiced.contains(id)
    }

    /// Candidates not yet practiced, in candidate order.
    #[must_use]
    pub fn unpracticed<'a>(&self, candidates: &'a [KnowledgeItem]) -> Vec<&'a KnowledgeItem> {
        candidates
            .iter()
            .filter(|item| !self.practiced.contains(item.id()))
            .collect()
    }

    /// `(practiced, total)` over the given candidates.
    #[must_use]
    pub fn coverage(&self, candidates: &[KnowledgeItem]) -> (usize, usize) {
        let practiced = candidates
            .iter()
            .filter(|item| self.practiced.contains(item.id()))
            .count();
        (practiced, candidates.len())
    }

    /// Drop ids that are no longer among `candidates`.
    pub fn retain_candidates(&mut self, candidates: &[KnowledgeItem]) {
        let live: HashSet<&KnowledgeId> = candidates.iter().map(KnowledgeItem::id).collect();
        self.practiced.retain(|id| live.contains(id));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.practiced.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.practiced.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{KnowledgeType, Language};
    use lingua_core::time::fixed_now;

    fn item(id: &str) -> KnowledgeItem {
        KnowledgeItem::new(
            KnowledgeId::new(id),
            Language::German,
            KnowledgeType::Word,
            format!("Wort {id}"),
            format!("palavra {id}"),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn marking_is_idempotent() {
        let mut tracker = SessionTracker::new();
        assert!(tracker.mark_practiced(KnowledgeId::new("a")));
        assert!(!tracker.mark_practiced(KnowledgeId::new("a")));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn unpracticed_keeps_candidate_order() {
        let candidates = vec![item("a"), item("b"), item("c")];
        let mut tracker = SessionTracker::new();
        tracker.mark_practiced(KnowledgeId::new("b"));
        let ids: Vec<_> = tracker
            .unpracticed(&candidates)
            .iter()
            .map(|i| i.id().as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(tracker.coverage(&candidates), (1, 3));
    }

    #[test]
    fn reset_restores_every_candidate() {
        let candidates = vec![item("a"), item("b")];
        let mut tracker = SessionTracker::new();
        for c in &candidates {
            tracker.mark_practiced(c.id().clone());
        }
        assert!(tracker.unpracticed(&candidates).is_empty());

        tracker.reset();
        assert_eq!(tracker.unpracticed(&candidates).len(), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn retain_drops_vanished_ids() {
        let mut tracker = SessionTracker::new();
        tracker.mark_practiced(KnowledgeId::new("gone"));
        tracker.mark_practiced(KnowledgeId::new("a"));
        tracker.retain_candidates(&[item("a")]);
        assert!(tracker.is_practiced(&KnowledgeId::new("a")));
        assert!(!tracker.is_practiced(&KnowledgeId::new("gone")));
    }
}
