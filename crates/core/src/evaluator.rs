use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{AnswerRecord, Difficulty, Item, ItemKind, WordStats};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluatorError {
    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("option {index} is out of range ({len} options)")]
    InvalidChoice { index: usize, len: usize },

    #[error("{response} responses do not apply to {kind} items")]
    KindMismatch {
        response: &'static str,
        kind: &'static str,
    },
}

//
// ─── RESPONSE ──────────────────────────────────────────────────────────────────
//

/// What the user did in reply to the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserResponse {
    /// Free text, typed by the user.
    Typed(String),
    /// Index into a multiple-choice option list.
    Choice(usize),
    /// Flashcard reveal followed by "I knew it" / "I didn't".
    SelfGrade(bool),
    /// Gave up on the item; always scored as incorrect.
    Skip,
}

impl UserResponse {
    #[must_use]
    pub fn typed(text: impl Into<String>) -> Self {
        Self::Typed(text.into())
    }

    fn label(&self) -> &'static str {
        match self {
            UserResponse::Typed(_) => "typed",
            UserResponse::Choice(_) => "choice",
            UserResponse::SelfGrade(_) => "self-graded",
            UserResponse::Skip => "skip",
        }
    }
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// A scored answer plus the advisory difficulty label for flashcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub record: AnswerRecord,
    pub difficulty: Option<Difficulty>,
}

/// Canonical form used for every answer comparison.
#[must_use]
pub fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive, whitespace-trimmed exact match.
///
/// ```
/// # use practice_core::evaluator::is_correct;
/// assert!(is_correct("Paris", "paris"));
/// assert!(is_correct(" Paris ", "Paris"));
/// assert!(!is_correct("Pariss", "Paris"));
/// ```
#[must_use]
pub fn is_correct(user_answer: &str, expected: &str) -> bool {
    normalize_answer(user_answer) == normalize_answer(expected)
}

/// Difficulty after folding one more answer into the prior counters.
#[must_use]
pub fn rolling_difficulty(prior: Option<&WordStats>, is_correct: bool) -> Difficulty {
    let (correct, shown) = prior.map_or((0, 0), |s| (s.times_correct, s.times_shown));
    let correct = f64::from(correct) + if is_correct { 1.0 } else { 0.0 };
    let shown = f64::from(shown) + 1.0;
    Difficulty::from_accuracy(correct / shown)
}

/// Score `response` against `item`.
///
/// `elapsed` is the time since the item was first shown; negative values
/// count as zero.
///
/// # Errors
///
/// Returns `EvaluatorError::EmptyAnswer` when typed input is required but the
/// trimmed answer is empty, `EvaluatorError::InvalidChoice` for an option
/// index outside the list, and `EvaluatorError::KindMismatch` when the
/// response does not fit the item kind.
pub fn evaluate(
    item: &Item,
    response: &UserResponse,
    elapsed: Duration,
    prior: Option<&WordStats>,
    answered_at: DateTime<Utc>,
) -> Result<Evaluation, EvaluatorError> {
    let response_time_ms = u64::try_from(elapsed.num_milliseconds()).unwrap_or(0);

    let record = match response {
        UserResponse::Skip => AnswerRecord::skipped(item.id(), response_time_ms, answered_at),
        UserResponse::Typed(text) => {
            if text.trim().is_empty() && item.kind().requires_typed_input() {
                return Err(EvaluatorError::EmptyAnswer);
            }
            let correct = is_correct(text, item.expected_answer());
            scored(item, text.trim(), correct, response_time_ms, answered_at)
        }
        UserResponse::Choice(index) => {
            let options = item.options().ok_or_else(|| mismatch(response, item))?;
            let chosen = options.get(*index).ok_or(EvaluatorError::InvalidChoice {
                index: *index,
                len: options.len(),
            })?;
            let correct = is_correct(chosen, item.expected_answer());
            scored(item, chosen, correct, response_time_ms, answered_at)
        }
        UserResponse::SelfGrade(knew_it) => {
            if item.kind() != ItemKind::Flashcard {
                return Err(mismatch(response, item));
            }
            let text = if *knew_it { item.expected_answer() } else { "" };
            scored(item, text, *knew_it, response_time_ms, answered_at)
        }
    };

    let difficulty = (item.kind() == ItemKind::Flashcard)
        .then(|| rolling_difficulty(prior, record.is_correct()));

    Ok(Evaluation { record, difficulty })
}

fn scored(
    item: &Item,
    user_answer: &str,
    correct: bool,
    response_time_ms: u64,
    answered_at: DateTime<Utc>,
) -> AnswerRecord {
    let points = if correct { item.points() } else { 0 };
    AnswerRecord::new(
        item.id(),
        user_answer,
        correct,
        response_time_ms,
        points,
        answered_at,
    )
}

fn mismatch(response: &UserResponse, item: &Item) -> EvaluatorError {
    EvaluatorError::KindMismatch {
        response: response.label(),
        kind: item.kind().as_str(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WordId;
    use crate::time::fixed_now;

    fn typing_item() -> Item {
        Item::typing(WordId::new(1), "capital of France", "Paris", 3)
    }

    fn choice_item() -> Item {
        Item::multiple_choice(
            WordId::new(2),
            "dog",
            "pies",
            vec!["kot".into(), "pies".into(), "koń".into()],
            1,
        )
        .unwrap()
    }

    #[test]
    fn correctness_ignores_case_and_outer_whitespace() {
        assert!(is_correct("Paris", "paris"));
        assert!(is_correct(" Paris ", "Paris"));
        assert!(!is_correct("Pariss", "Paris"));
        assert!(!is_correct("Pa ris", "Paris"));
        assert!(is_correct("ŻÓŁW", "żółw"));
    }

    #[test]
    fn correct_typed_answer_awards_item_points() {
        let eval = evaluate(
            &typing_item(),
            &UserResponse::typed("  paris "),
            Duration::milliseconds(1_250),
            None,
            fixed_now(),
        )
        .unwrap();

        assert!(eval.record.is_correct());
        assert_eq!(eval.record.points_awarded(), 3);
        assert_eq!(eval.record.response_time_ms(), 1_250);
        assert_eq!(eval.record.user_answer(), "paris");
        assert_eq!(eval.difficulty, None);
    }

    #[test]
    fn wrong_answer_awards_nothing() {
        let eval = evaluate(
            &typing_item(),
            &UserResponse::typed("Lyon"),
            Duration::zero(),
            None,
            fixed_now(),
        )
        .unwrap();
        assert!(!eval.record.is_correct());
        assert_eq!(eval.record.points_awarded(), 0);
    }

    #[test]
    fn blank_typed_answer_is_rejected() {
        let err = evaluate(
            &typing_item(),
            &UserResponse::typed("   "),
            Duration::zero(),
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, EvaluatorError::EmptyAnswer);
    }

    #[test]
    fn choice_is_checked_against_options() {
        let item = choice_item();
        let right = evaluate(&item, &UserResponse::Choice(1), Duration::zero(), None, fixed_now())
            .unwrap();
        assert!(right.record.is_correct());

        let wrong = evaluate(&item, &UserResponse::Choice(0), Duration::zero(), None, fixed_now())
            .unwrap();
        assert!(!wrong.record.is_correct());
        assert_eq!(wrong.record.user_answer(), "kot");

        let err = evaluate(&item, &UserResponse::Choice(7), Duration::zero(), None, fixed_now())
            .unwrap_err();
        assert_eq!(err, EvaluatorError::InvalidChoice { index: 7, len: 3 });
    }

    #[test]
    fn choice_on_typing_item_is_a_mismatch() {
        let err = evaluate(
            &typing_item(),
            &UserResponse::Choice(0),
            Duration::zero(),
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, EvaluatorError::KindMismatch { .. }));
    }

    #[test]
    fn negative_elapsed_clamps_to_zero() {
        let eval = evaluate(
            &typing_item(),
            &UserResponse::Skip,
            Duration::milliseconds(-40),
            None,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(eval.record.response_time_ms(), 0);
        assert!(eval.record.is_skipped());
    }

    #[test]
    fn flashcards_get_a_rolling_difficulty() {
        let card = Item::flashcard(WordId::new(5), "cat", "kot", 1);
        let mut prior = WordStats::new(WordId::new(5));
        prior.times_shown = 4;
        prior.times_correct = 3;

        // (3 + 1) / (4 + 1) = 0.8
        let knew = evaluate(&card, &UserResponse::SelfGrade(true), Duration::zero(), Some(&prior), fixed_now())
            .unwrap();
        assert_eq!(knew.difficulty, Some(Difficulty::Easy));

        // 3 / 5 = 0.6
        let missed = evaluate(&card, &UserResponse::typed("pies"), Duration::zero(), Some(&prior), fixed_now())
            .unwrap();
        assert_eq!(missed.difficulty, Some(Difficulty::Medium));

        let first_miss =
            evaluate(&card, &UserResponse::SelfGrade(false), Duration::zero(), None, fixed_now())
                .unwrap();
        assert_eq!(first_miss.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn self_grade_is_flashcard_only() {
        let err = evaluate(
            &choice_item(),
            &UserResponse::SelfGrade(true),
            Duration::zero(),
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EvaluatorError::KindMismatch {
                response: "self-graded",
                kind: "multiple_choice"
            }
        );
    }
}
