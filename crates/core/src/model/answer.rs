use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::WordId;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Advisory difficulty label derived from a word's rolling accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const EASY_THRESHOLD: f64 = 0.8;
    pub const MEDIUM_THRESHOLD: f64 = 0.5;

    #[must_use]
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= Self::EASY_THRESHOLD {
            Difficulty::Easy
        } else if accuracy >= Self::MEDIUM_THRESHOLD {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDifficultyError(pub String);

impl fmt::Display for ParseDifficultyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty: {}", self.0)
    }
}

impl std::error::Error for ParseDifficultyError {}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// One scored response. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    item_id: WordId,
    user_answer: String,
    is_correct: bool,
    response_time_ms: u64,
    points_awarded: u32,
    skipped: bool,
    answered_at: DateTime<Utc>,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(
        item_id: WordId,
        user_answer: impl Into<String>,
        is_correct: bool,
        response_time_ms: u64,
        points_awarded: u32,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            user_answer: user_answer.into(),
            is_correct,
            response_time_ms,
            points_awarded,
            skipped: false,
            answered_at,
        }
    }

    /// A skip is recorded as an incorrect answer with no text.
    #[must_use]
    pub fn skipped(item_id: WordId, response_time_ms: u64, answered_at: DateTime<Utc>) -> Self {
        Self {
            skipped: true,
            ..Self::new(item_id, String::new(), false, response_time_ms, 0, answered_at)
        }
    }

    #[must_use]
    pub fn item_id(&self) -> WordId {
        self.item_id
    }

    #[must_use]
    pub fn user_answer(&self) -> &str {
        &self.user_answer
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    #[must_use]
    pub fn points_awarded(&self) -> u32 {
        self.points_awarded
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }
}

//
// ─── WORD STATS ────────────────────────────────────────────────────────────────
//

/// Long-lived per-word practice counters, kept outside any single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStats {
    pub word_id: WordId,
    pub times_shown: u32,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub difficulty: Option<Difficulty>,
    pub last_practiced_at: Option<DateTime<Utc>>,
}

impl WordStats {
    #[must_use]
    pub fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            times_shown: 0,
            times_correct: 0,
            times_incorrect: 0,
            difficulty: None,
            last_practiced_at: None,
        }
    }

    /// Fold one answer into the counters.
    ///
    /// A `difficulty` of `None` keeps the previous label.
    pub fn record(
        &mut self,
        is_correct: bool,
        difficulty: Option<Difficulty>,
        at: DateTime<Utc>,
    ) {
        self.times_shown = self.times_shown.saturating_add(1);
        if is_correct {
            self.times_correct = self.times_correct.saturating_add(1);
        } else {
            self.times_incorrect = self.times_incorrect.saturating_add(1);
        }
        if difficulty.is_some() {
            self.difficulty = difficulty;
        }
        self.last_practiced_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn difficulty_thresholds() {
        assert_eq!(Difficulty::from_accuracy(1.0), Difficulty::Easy);
        assert_eq!(Difficulty::from_accuracy(0.8), Difficulty::Easy);
        assert_eq!(Difficulty::from_accuracy(0.79), Difficulty::Medium);
        assert_eq!(Difficulty::from_accuracy(0.5), Difficulty::Medium);
        assert_eq!(Difficulty::from_accuracy(0.49), Difficulty::Hard);
        assert_eq!(Difficulty::from_accuracy(0.0), Difficulty::Hard);
    }

    #[test]
    fn difficulty_parses_its_own_labels() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(d.as_str().parse::<Difficulty>().unwrap(), d);
        }
        assert!("trivial".parse::<Difficulty>().is_err());
    }

    #[test]
    fn skipped_record_is_incorrect_and_empty() {
        let record = AnswerRecord::skipped(WordId::new(3), 250, fixed_now());
        assert!(!record.is_correct());
        assert!(record.is_skipped());
        assert_eq!(record.user_answer(), "");
        assert_eq!(record.points_awarded(), 0);
    }

    #[test]
    fn stats_record_counts_and_keeps_label_when_absent() {
        let mut stats = WordStats::new(WordId::new(1));
        stats.record(true, Some(Difficulty::Easy), fixed_now());
        stats.record(false, None, fixed_now());

        assert_eq!(stats.times_shown, 2);
        assert_eq!(stats.times_correct, 1);
        assert_eq!(stats.times_incorrect, 1);
        assert_eq!(stats.difficulty, Some(Difficulty::Easy));
        assert_eq!(stats.last_practiced_at, Some(fixed_now()));
    }
}
