//! Derives the candidate set of a practice session from the full corpus.

use std::collections::BTreeSet;

use crate::model::{FilterCriteria, KnowledgeItem, KnowledgeType, Language};

/// Items matching `criteria`, in corpus order.
///
/// An empty result is a valid outcome, not an error.
#[must_use]
pub fn filter_candidates(
    corpus: &[KnowledgeItem],
    criteria: &FilterCriteria,
) -> Vec<KnowledgeItem> {
    corpus
        .iter()
        .filter(|item| criteria.matches(item))
        .cloned()
        .collect()
}

/// Distinct languages present in the corpus, sorted.
#[must_use]
pub fn available_languages(corpus: &[KnowledgeItem]) -> Vec<Language> {
    corpus
        .iter()
        .map(KnowledgeItem::language)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct knowledge types present in the corpus, sorted.
#[must_use]
pub fn available_types(corpus: &[KnowledgeItem]) -> Vec<KnowledgeType> {
    corpus
        .iter()
        .map(KnowledgeItem::knowledge_type)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First available language with every knowledge type, or `None` for an empty corpus.
#[must_use]
pub fn default_criteria(corpus: &[KnowledgeItem]) -> Option<FilterCriteria> {
    available_languages(corpus)
        .first()
        .copied()
        .map(FilterCriteria::all_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KnowledgeId, KnowledgeTypeFilter};
    use crate::time::fixed_now;

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
            item("1", Language::English, KnowledgeType::Word),
            item("2", Language::German, KnowledgeType::Phrase),
            item("3", Language::German, KnowledgeType::Word),
            item("4", Language::German, KnowledgeType::Phrase),
        ]
    }

    #[test]
    fn filters_by_language_and_type_preserving_order() {
        let criteria = FilterCriteria::new(Language::German, KnowledgeType::Phrase);
        let ids: Vec<_> = filter_candidates(&corpus(), &criteria)
            .iter()
            .map(|i| i.id().as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["2", "4"]);
    }

    #[test]
    fn all_type_keeps_every_item_of_the_language() {
        let criteria = FilterCriteria::new(Language::German, KnowledgeTypeFilter::All);
        assert_eq!(filter_candidates(&corpus(), &criteria).len(), 3);
    }

    #[test]
    fn empty_corpus_yields_empty_candidates() {
        let criteria = FilterCriteria::all_of(Language::English);
        assert!(filter_candidates(&[], &criteria).is_empty());
        assert!(default_criteria(&[]).is_none());
    }

    #[test]
    fn filtering_is_repeatable() {
        let corpus = corpus();
        let criteria = FilterCriteria::all_of(Language::German);
        let first = filter_candidates(&corpus, &criteria);
        let second = filter_candidates(&corpus, &criteria);
        assert_eq!(first, second);
        assert_eq!(corpus.len(), 4);
    }

    #[test]
    fn defaults_to_first_sorted_language() {
        let criteria = default_criteria(&corpus()).unwrap();
        assert_eq!(criteria.language, Language::German);
        assert_eq!(criteria.knowledge_type, KnowledgeTypeFilter::All);
        assert_eq!(
            available_types(&corpus()),
            vec![KnowledgeType::Phrase, KnowledgeType::Word]
        );
    }
}
