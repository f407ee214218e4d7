use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::model::item::{DEFAULT_ITEM_POINTS, ItemKind};
use crate::model::word::Word;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("item limit must be > 0")]
    InvalidItemLimit,

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("at least one question kind must be allowed")]
    NoQuestionKinds,

    #[error("points per item must be > 0")]
    InvalidPoints,

    #[error("time limits apply to quizzes only")]
    TimeLimitRequiresQuiz,

    #[error("reviewing incorrect answers applies to flashcards only")]
    ReviewRequiresFlashcards,
}

//
// ─── DIRECTION / MODE ──────────────────────────────────────────────────────────
//

/// Which side of a word pair is shown as the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Prompt with the word, expect the translation.
    #[default]
    Forward,
    /// Prompt with the translation, expect the word.
    Reverse,
}

impl Direction {
    #[must_use]
    pub fn prompt<'a>(self, word: &'a Word) -> &'a str {
        match self {
            Direction::Forward => &word.word,
            Direction::Reverse => &word.translation,
        }
    }

    #[must_use]
    pub fn answer<'a>(self, word: &'a Word) -> &'a str {
        match self {
            Direction::Forward => &word.translation,
            Direction::Reverse => &word.word,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Flashcards,
    Quiz,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Flashcards => "flashcards",
            SessionMode::Quiz => "quiz",
        }
    }
}

/// Question kinds a quiz may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSet {
    pub multiple_choice: bool,
    pub typing: bool,
}

impl KindSet {
    #[must_use]
    pub fn both() -> Self {
        Self {
            multiple_choice: true,
            typing: true,
        }
    }

    /// Allowed kinds in a stable order (multiple-choice first).
    #[must_use]
    pub fn kinds(&self) -> Vec<ItemKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.multiple_choice {
            kinds.push(ItemKind::MultipleChoice);
        }
        if self.typing {
            kinds.push(ItemKind::Typing);
        }
        kinds
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.multiple_choice && !self.typing
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::both()
    }
}

//
// ─── SESSION SETTINGS ──────────────────────────────────────────────────────────
//

/// Options chosen by the user before a practice session starts.
///
/// Construct with [`SessionSettings::flashcards`] or [`SessionSettings::quiz`]
/// and adjust with the `with_*` methods; call [`SessionSettings::validate`]
/// before building a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    mode: SessionMode,
    direction: Direction,
    shuffle: bool,
    shuffle_options: bool,
    item_limit: Option<u32>,
    time_limit_secs: Option<u32>,
    review_incorrect: bool,
    allowed_kinds: KindSet,
    points_per_item: u32,
}

impl SessionSettings {
    #[must_use]
    pub fn flashcards() -> Self {
        Self {
            mode: SessionMode::Flashcards,
            direction: Direction::Forward,
            shuffle: false,
            shuffle_options: true,
            item_limit: None,
            time_limit_secs: None,
            review_incorrect: false,
            allowed_kinds: KindSet::both(),
            points_per_item: DEFAULT_ITEM_POINTS,
        }
    }

    #[must_use]
    pub fn quiz() -> Self {
        Self {
            mode: SessionMode::Quiz,
            ..Self::flashcards()
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle_options: bool) -> Self {
        self.shuffle_options = shuffle_options;
        self
    }

    #[must_use]
    pub fn with_item_limit(mut self, limit: Option<u32>) -> Self {
        self.item_limit = limit;
        self
    }

    #[must_use]
    pub fn with_time_limit_secs(mut self, secs: Option<u32>) -> Self {
        self.time_limit_secs = secs;
        self
    }

    #[must_use]
    pub fn with_review_incorrect(mut self, review: bool) -> Self {
        self.review_incorrect = review;
        self
    }

    #[must_use]
    pub fn with_allowed_kinds(mut self, kinds: KindSet) -> Self {
        self.allowed_kinds = kinds;
        self
    }

    #[must_use]
    pub fn with_points_per_item(mut self, points: u32) -> Self {
        self.points_per_item = points;
        self
    }

    /// Checks that the combination of options can start a session.
    ///
    /// # Errors
    ///
    /// Returns the first `SettingsError` found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.item_limit == Some(0) {
            return Err(SettingsError::InvalidItemLimit);
        }
        if self.time_limit_secs == Some(0) {
            return Err(SettingsError::InvalidTimeLimit);
        }
        if self.points_per_item == 0 {
            return Err(SettingsError::InvalidPoints);
        }
        match self.mode {
            SessionMode::Quiz => {
                if self.allowed_kinds.is_empty() {
                    return Err(SettingsError::NoQuestionKinds);
                }
                if self.review_incorrect {
                    return Err(SettingsError::ReviewRequiresFlashcards);
                }
            }
            SessionMode::Flashcards => {
                if self.time_limit_secs.is_some() {
                    return Err(SettingsError::TimeLimitRequiresQuiz);
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }

    #[must_use]
    pub fn item_limit(&self) -> Option<u32> {
        self.item_limit
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn review_incorrect(&self) -> bool {
        self.review_incorrect
    }

    #[must_use]
    pub fn allowed_kinds(&self) -> KindSet {
        self.allowed_kinds
    }

    #[must_use]
    pub fn points_per_item(&self) -> u32 {
        self.points_per_item
    }
}

//
// ─── FEEDBACK POLICY ───────────────────────────────────────────────────────────
//

/// How long the caller keeps answer feedback on screen before advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackPolicy {
    pub flashcard_delay: Duration,
    pub quiz_delay: Duration,
}

impl FeedbackPolicy {
    /// No delay at all; for scripted runs and tests.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            flashcard_delay: Duration::ZERO,
            quiz_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delay_for(&self, mode: SessionMode) -> Duration {
        match mode {
            SessionMode::Flashcards => self.flashcard_delay,
            SessionMode::Quiz => self.quiz_delay,
        }
    }
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self {
            flashcard_delay: Duration::from_millis(1_500),
            quiz_delay: Duration::from_millis(1_000),
        }
    }
}
