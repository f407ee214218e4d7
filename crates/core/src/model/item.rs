use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluator::normalize_answer;
use crate::model::ids::WordId;

/// Points awarded for a correct answer unless the settings say otherwise.
pub const DEFAULT_ITEM_POINTS: u32 = 1;

/// Most distractors a multiple-choice item may carry.
pub const MAX_DISTRACTORS: usize = 3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("multiple-choice options must contain the correct answer exactly once, found {found}")]
    CorrectAnswerCount { found: usize },

    #[error("multiple-choice items allow at most {MAX_DISTRACTORS} distractors, got {got}")]
    TooManyDistractors { got: usize },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How an item is presented and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Flashcard,
    MultipleChoice,
    Typing,
}

impl ItemKind {
    /// Whether a typed answer is the normal way to respond to this kind.
    #[must_use]
    pub fn requires_typed_input(self) -> bool {
        matches!(self, ItemKind::Flashcard | ItemKind::Typing)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Flashcard => "flashcard",
            ItemKind::MultipleChoice => "multiple_choice",
            ItemKind::Typing => "typing",
        }
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// A single practice unit derived from one word/translation pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: WordId,
    prompt: String,
    expected_answer: String,
    kind: ItemKind,
    options: Option<Vec<String>>,
    points: u32,
}

impl Item {
    #[must_use]
    pub fn flashcard(
        id: WordId,
        prompt: impl Into<String>,
        expected_answer: impl Into<String>,
        points: u32,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            expected_answer: expected_answer.into(),
            kind: ItemKind::Flashcard,
            options: None,
            points,
        }
    }

    #[must_use]
    pub fn typing(
        id: WordId,
        prompt: impl Into<String>,
        expected_answer: impl Into<String>,
        points: u32,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            expected_answer: expected_answer.into(),
            kind: ItemKind::Typing,
            options: None,
            points,
        }
    }

    /// Creates a multiple-choice item from an already-assembled option list.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::CorrectAnswerCount` unless `options` holds the
    /// expected answer exactly once (case-insensitive), and
    /// `ItemError::TooManyDistractors` when more than three other options are given.
    pub fn multiple_choice(
        id: WordId,
        prompt: impl Into<String>,
        expected_answer: impl Into<String>,
        options: Vec<String>,
        points: u32,
    ) -> Result<Self, ItemError> {
        let expected_answer = expected_answer.into();
        let expected = normalize_answer(&expected_answer);
        let found = options
            .iter()
            .filter(|option| normalize_answer(option) == expected)
            .count();
        if found != 1 {
            return Err(ItemError::CorrectAnswerCount { found });
        }
        let distractors = options.len() - 1;
        if distractors > MAX_DISTRACTORS {
            return Err(ItemError::TooManyDistractors { got: distractors });
        }

        Ok(Self {
            id,
            prompt: prompt.into(),
            expected_answer,
            kind: ItemKind::MultipleChoice,
            options: Some(options),
            points,
        })
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn expected_answer(&self) -> &str {
        &self.expected_answer
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Option list, present only on multiple-choice items.
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }
}
