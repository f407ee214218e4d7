/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub position: usize,
    pub answered: usize,
    pub correct: usize,
    pub points: u32,
    pub review_pending: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of answers so far that were correct, as a whole percent.
    #[must_use]
    pub fn accuracy_percent(&self) -> usize {
        if self.answered == 0 {
            return 0;
        }
        (self.correct * 100 + self.answered / 2) / self.answered
    }
}
