/// Aggregated view of session progress, useful for a "3 / 10 practiced" line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub practiced: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn from_coverage((practiced, total): (usize, usize), is_complete: bool) -> Self {
        Self {
            total,
            practiced,
            remaining: total.saturating_sub(practiced),
            is_complete,
        }
    }
}
