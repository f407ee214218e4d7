use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{AnswerRecord, Item, SessionMode, WordSetId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },

    #[error("total answers ({total}) does not match correct + incorrect ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate summary handed to the caller once a session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    word_set_id: WordSetId,
    mode: SessionMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_items: u32,
    total_answers: u32,
    correct: u32,
    incorrect: u32,
    skipped: u32,
    points: u32,
    max_points: u32,
    review_attempts: u32,
    timed_out: bool,
}

/// Counters that make up a summary, grouped so persisted rows can be rehydrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryCounts {
    pub total_items: u32,
    pub total_answers: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub skipped: u32,
    pub points: u32,
    pub max_points: u32,
    pub review_attempts: u32,
}

impl SessionSummary {
    /// Rehydrate a summary from stored counters.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` or `SummaryError::CountMismatch`.
    pub fn from_persisted(
        word_set_id: WordSetId,
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        counts: SummaryCounts,
        timed_out: bool,
    ) -> Result<Self, SummaryError> {
        if completed_at < started_at {
            return Err(SummaryError::InvalidTimeRange);
        }
        let sum = counts.correct.saturating_add(counts.incorrect);
        if sum != counts.total_answers {
            return Err(SummaryError::CountMismatch {
                total: counts.total_answers,
                sum,
            });
        }

        Ok(Self {
            word_set_id,
            mode,
            started_at,
            completed_at,
            total_items: counts.total_items,
            total_answers: counts.total_answers,
            correct: counts.correct,
            incorrect: counts.incorrect,
            skipped: counts.skipped,
            points: counts.points,
            max_points: counts.max_points,
            review_attempts: counts.review_attempts,
            timed_out,
        })
    }

    /// Build a summary from the session's items and answer log.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SummaryError::TooManyAnswers` if a count cannot fit in `u32`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_answers(
        word_set_id: WordSetId,
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        items: &[Item],
        answers: &[AnswerRecord],
        review_attempts: u32,
        timed_out: bool,
    ) -> Result<Self, SummaryError> {
        let to_u32 = |len: usize| {
            u32::try_from(len).map_err(|_| SummaryError::TooManyAnswers { len })
        };

        let mut counts = SummaryCounts {
            total_items: to_u32(items.len())?,
            total_answers: to_u32(answers.len())?,
            review_attempts,
            ..SummaryCounts::default()
        };
        for item in items {
            counts.max_points = counts.max_points.saturating_add(item.points());
        }
        for answer in answers {
            if answer.is_correct() {
                counts.correct = counts.correct.saturating_add(1);
            } else {
                counts.incorrect = counts.incorrect.saturating_add(1);
            }
            if answer.is_skipped() {
                counts.skipped = counts.skipped.saturating_add(1);
            }
            counts.points = counts.points.saturating_add(answer.points_awarded());
        }

        Self::from_persisted(word_set_id, mode, started_at, completed_at, counts, timed_out)
    }

    #[must_use]
    pub fn word_set_id(&self) -> WordSetId {
        self.word_set_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub fn total_answers(&self) -> u32 {
        self.total_answers
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.max_points
    }

    #[must_use]
    pub fn review_attempts(&self) -> u32 {
        self.review_attempts
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Share of answers that were correct, rounded to a whole percent.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        percent(self.correct, self.total_answers)
    }

    /// Points earned against the points available in the pool.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        percent(self.points, self.max_points)
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = u64::from(part) * 100 + u64::from(whole) / 2;
    u32::try_from(scaled / u64::from(whole)).unwrap_or(u32::MAX)
}
