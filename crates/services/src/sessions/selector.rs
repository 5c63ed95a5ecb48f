use rand::Rng;
use rand::seq::IndexedRandom;

/// Outcome of asking for the next practice item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Item(T),
    /// Nothing left to practice. This ends the session; it is not a failure.
    Exhausted,
}

impl<T> Selection<T> {
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Selection::Exhausted)
    }

    pub fn item(self) -> Option<T> {
        match self {
            Selection::Item(item) => Some(item),
            Selection::Exhausted => None,
        }
    }
}

/// Uniform random pick among the unpracticed candidates.
pub struct ItemSelector;

impl ItemSelector {
    pub fn select_next<T: Clone, R: Rng + ?Sized>(rng: &mut R, unpracticed: &[T]) -> Selection<T> {
        match unpracticed.choose(rng) {
            Some(item) => Selection::Item(item.clone()),
            None => Selection::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn empty_input_is_exhausted() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty: [u32; 0] = [];
        assert!(ItemSelector::select_next(&mut rng, &empty).is_exhausted());
    }

    #[test]
    fn single_candidate_is_always_returned() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(ItemSelector::select_next(&mut rng, &["only"]), Selection::Item("only"));
        }
    }

    #[test]
    fn every_candidate_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = [1, 2, 3, 4];
        let mut hits = [0_u32; 4];
        for _ in 0..400 {
            let picked = ItemSelector::select_next(&mut rng, &items).item().unwrap();
            hits[picked - 1] += 1;
        }
        assert!(hits.iter().all(|h| *h > 0));
    }
}
