use std::collections::HashSet;

use lingua_core::model::{
    FilterCriteria, KnowledgeId, KnowledgeItem, KnowledgeType, KnowledgeTypeFilter, Language,
};
use lingua_core::time::fixed_now;
use lingua_core::verify::verify_exact;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{PracticeSession, SessionTracker};

fn arb_item(index: usize) -> impl Strategy<Value = KnowledgeItem> {
    (any::<bool>(), any::<bool>()).prop_map(move |(german, phrase)| {
        KnowledgeItem::new(
            KnowledgeId::new(format!("item-{index}")),
            if german { Language::German } else { Language::English },
            if phrase { KnowledgeType::Phrase } else { KnowledgeType::Word },
            format!("text {index}"),
            format!("translation {index}"),
            fixed_now(),
        )
        .unwrap()
    })
}

fn arb_corpus() -> impl Strategy<Value = Vec<KnowledgeItem>> {
    (0_usize..24).prop_flat_map(|len| (0..len).map(arb_item).collect::<Vec<_>>())
}

fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        prop_oneof![Just(Language::German), Just(Language::English)],
        prop_oneof![
            Just(KnowledgeTypeFilter::All),
            Just(KnowledgeTypeFilter::Only(KnowledgeType::Word)),
            Just(KnowledgeTypeFilter::Only(KnowledgeType::Phrase)),
        ],
    )
        .prop_map(|(language, knowledge_type)| FilterCriteria::new(language, knowledge_type))
}

fn practice_current(session: &mut PracticeSession) {
    let item = session.begin_verification().unwrap();
    session
        .finish_verification(verify_exact(item.translation(), "anything"))
        .unwrap();
}

proptest! {
    /// No item comes back twice before the session completes.
    #[test]
    fn items_never_repeat(
        corpus in arb_corpus(),
        criteria in arb_criteria(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = PracticeSession::new(criteria, &corpus);
        let expected = session.candidates().len();
        let mut seen = HashSet::new();

        while let Some(item) = session.present_next(&mut rng).unwrap() {
            prop_assert!(seen.insert(item.id().clone()));
            practice_current(&mut session);
        }

        prop_assert_eq!(seen.len(), expected);
        prop_assert!(session.is_complete());
    }

    /// Marking every candidate leaves nothing unpracticed and completes the session.
    #[test]
    fn full_coverage_completes(
        corpus in arb_corpus(),
        criteria in arb_criteria(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = PracticeSession::new(criteria, &corpus);
        let total = session.candidates().len();
        for _ in 0..total {
            prop_assert!(session.present_next(&mut rng).unwrap().is_some());
            practice_current(&mut session);
        }

        prop_assert!(session.tracker().unpracticed(session.candidates()).is_empty());
        prop_assert!(session.present_next(&mut rng).unwrap().is_none());
        prop_assert!(session.is_complete());
        prop_assert_eq!(session.progress().practiced, total);
    }

    /// After a reset every candidate is unpracticed again, in candidate order.
    #[test]
    fn reset_restores_all_candidates(
        corpus in arb_corpus(),
        marks in proptest::collection::vec(any::<prop::sample::Index>(), 0..30),
    ) {
        let mut tracker = SessionTracker::new();
        if !corpus.is_empty() {
            for mark in &marks {
                tracker.mark_practiced(mark.get(&corpus).id().clone());
            }
        }

        tracker.reset();
        let ids: Vec<_> = tracker.unpracticed(&corpus).into_iter().map(KnowledgeItem::id).collect();
        let expected: Vec<_> = corpus.iter().map(KnowledgeItem::id).collect();
        prop_assert_eq!(ids, expected);
    }
}
