use practice_core::model::WordId;

/// Notifications emitted on every session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ItemPresented {
        index: usize,
        item_id: WordId,
        review: bool,
    },
    Answered {
        item_id: WordId,
        is_correct: bool,
    },
    QueuedForReview {
        item_id: WordId,
    },
    Completed {
        timed_out: bool,
    },
}

/// Callback invoked synchronously after each transition.
pub type SessionListener = Box<dyn FnMut(&SessionEvent) + Send>;
