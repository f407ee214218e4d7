use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;

use practice_core::evaluator::{UserResponse, evaluate};
use practice_core::model::{
    AnswerRecord, Difficulty, Item, ItemKind, SessionMode, SessionSettings, SessionSummary,
    WordId, WordSetId, WordStats,
};

use super::countdown::Countdown;
use super::events::{SessionEvent, SessionListener};
use super::plan::SessionPlan;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Current item is shown and waiting for a response.
    Presenting,
    /// Response recorded; the caller shows feedback, then calls `advance`.
    Answered,
    /// Terminal.
    Completed,
}

//
// ─── ANSWER RESULT ─────────────────────────────────────────────────────────────
//

/// Outcome of one `submit_answer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswer {
    pub record: AnswerRecord,
    pub difficulty: Option<Difficulty>,
    pub queued_for_review: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory practice run over a fixed item pool.
///
/// Every transition takes `now` from the caller's clock. Flashcard sessions
/// may re-queue incorrectly answered items; quiz sessions may carry a
/// countdown that forces completion.
pub struct PracticeSession {
    word_set_id: WordSetId,
    settings: SessionSettings,
    items: Vec<Item>,
    current: usize,
    answers: Vec<AnswerRecord>,
    review_queue: VecDeque<WordId>,
    in_review: bool,
    review_attempts: u32,
    phase: SessionPhase,
    started_at: DateTime<Utc>,
    item_shown_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    timed_out: bool,
    countdown: Option<Countdown>,
    listener: Option<SessionListener>,
}

impl PracticeSession {
    /// Start a session over a built plan.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if the plan has no items and
    /// `SessionError::InvalidSettings` if the settings do not validate.
    pub fn start(
        word_set_id: WordSetId,
        plan: SessionPlan,
        settings: SessionSettings,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        settings.validate()?;
        if plan.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        let countdown = settings
            .time_limit_secs()
            .map(|secs| Countdown::new(started_at, secs));

        log::info!(
            "starting {} session for word set {} with {} items",
            settings.mode().as_str(),
            word_set_id,
            plan.total()
        );

        Ok(Self {
            word_set_id,
            settings,
            items: plan.items,
            current: 0,
            answers: Vec::new(),
            review_queue: VecDeque::new(),
            in_review: false,
            review_attempts: 0,
            phase: SessionPhase::Presenting,
            started_at,
            item_shown_at: started_at,
            completed_at: None,
            timed_out: false,
            countdown,
            listener: None,
        })
    }

    /// Attach a callback that observes every transition.
    #[must_use]
    pub fn with_listener(mut self, listener: SessionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn word_set_id(&self) -> WordSetId {
        self.word_set_id
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.settings.mode()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The item being shown, `None` once completed.
    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        if self.is_complete() {
            return None;
        }
        self.items.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn review_queue(&self) -> &VecDeque<WordId> {
        &self.review_queue
    }

    /// Whether the current item came from the review queue.
    #[must_use]
    pub fn is_reviewing(&self) -> bool {
        self.in_review && !self.is_complete()
    }

    #[must_use]
    pub fn review_attempts(&self) -> u32 {
        self.review_attempts
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    #[must_use]
    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    #[must_use]
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.countdown.map(|c| c.remaining(now))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.items.len(),
            position: self.current,
            answered: self.answers.len(),
            correct: self.answers.iter().filter(|a| a.is_correct()).count(),
            points: self.answers.iter().map(AnswerRecord::points_awarded).sum(),
            review_pending: self.review_queue.len(),
            is_complete: self.is_complete(),
        }
    }

    /// Flashcard completion: the last pool position has been answered and
    /// nothing is waiting in the review queue.
    #[must_use]
    pub fn is_flashcard_complete(&self) -> bool {
        let Some(last) = self.items.last() else {
            return false;
        };
        let at_last = self.in_review || self.current + 1 == self.items.len();
        at_last
            && self.review_queue.is_empty()
            && self.answers.iter().any(|a| a.item_id() == last.id())
    }

    /// Score a response to the current item.
    ///
    /// `prior` carries the word's long-lived stats and only feeds the
    /// flashcard difficulty label.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once terminal (including a lapsed
    /// time limit), `SessionError::NotPresenting` if the item was already
    /// answered, and `SessionError::Evaluator` for rejected input. State is
    /// unchanged on error.
    pub fn submit_answer(
        &mut self,
        response: &UserResponse,
        prior: Option<&WordStats>,
        now: DateTime<Utc>,
    ) -> Result<SessionAnswer, SessionError> {
        self.expire_if_due(now);
        match self.phase {
            SessionPhase::Completed => return Err(SessionError::Completed),
            SessionPhase::Answered => return Err(SessionError::NotPresenting),
            SessionPhase::Presenting => {}
        }

        let item = self.items.get(self.current).ok_or(SessionError::Completed)?;
        let evaluation = evaluate(item, response, now - self.item_shown_at, prior, now)?;
        let item_id = item.id();
        let is_correct = evaluation.record.is_correct();

        let queued_for_review = self.settings.review_incorrect()
            && item.kind() == ItemKind::Flashcard
            && !is_correct
            && !self.review_queue.contains(&item_id);
        if queued_for_review {
            self.review_queue.push_back(item_id);
        }
        if self.in_review {
            self.review_attempts = self.review_attempts.saturating_add(1);
        }

        self.answers.push(evaluation.record.clone());
        self.phase = SessionPhase::Answered;
        log::debug!("item {item_id} answered, correct={is_correct}");

        self.emit(&SessionEvent::Answered {
            item_id,
            is_correct,
        });
        if queued_for_review {
            self.emit(&SessionEvent::QueuedForReview { item_id });
        }

        Ok(SessionAnswer {
            record: evaluation.record,
            difficulty: evaluation.difficulty,
            queued_for_review,
        })
    }

    /// Move past an answered item.
    ///
    /// Walks the pool in order; once the pool is exhausted, revisits queued
    /// items head first; completes when both are done.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once terminal and
    /// `SessionError::NotAnswered` while the current item is unanswered.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<SessionPhase, SessionError> {
        self.expire_if_due(now);
        match self.phase {
            SessionPhase::Completed => return Err(SessionError::Completed),
            SessionPhase::Presenting => return Err(SessionError::NotAnswered),
            SessionPhase::Answered => {}
        }

        if !self.in_review && self.current + 1 < self.items.len() {
            self.current += 1;
            self.present(now);
            return Ok(self.phase);
        }

        while let Some(item_id) = self.review_queue.pop_front() {
            let Some(position) = self.items.iter().position(|i| i.id() == item_id) else {
                log::warn!("review item {item_id} is not part of the pool");
                continue;
            };
            self.in_review = true;
            self.current = position;
            self.present(now);
            return Ok(self.phase);
        }

        self.complete(now, false);
        Ok(self.phase)
    }

    /// Give up on the current item: recorded as incorrect, then advanced.
    ///
    /// # Errors
    ///
    /// Same as [`PracticeSession::submit_answer`].
    pub fn skip(
        &mut self,
        prior: Option<&WordStats>,
        now: DateTime<Utc>,
    ) -> Result<SessionAnswer, SessionError> {
        let answer = self.submit_answer(&UserResponse::Skip, prior, now)?;
        self.advance(now)?;
        Ok(answer)
    }

    /// Force completion when the time limit has lapsed.
    ///
    /// Returns true only on the call that performed the transition.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_complete() {
            return false;
        }
        match self.countdown {
            Some(countdown) if countdown.is_expired(now) => {
                log::info!(
                    "time limit reached for word set {} at item {}",
                    self.word_set_id,
                    self.current
                );
                self.complete(now, true);
                true
            }
            _ => false,
        }
    }

    /// End the session early at the user's request. No-op once completed.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        if !self.expire_if_due(now) && !self.is_complete() {
            self.complete(now, false);
        }
    }

    /// Summary of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` before completion and
    /// `SessionError::Summary` if the counts are inconsistent.
    pub fn build_summary(&self) -> Result<SessionSummary, SessionError> {
        let completed_at = self.completed_at.ok_or(SessionError::NotComplete)?;
        Ok(SessionSummary::from_answers(
            self.word_set_id,
            self.settings.mode(),
            self.started_at,
            completed_at,
            &self.items,
            &self.answers,
            self.review_attempts,
            self.timed_out,
        )?)
    }

    fn present(&mut self, now: DateTime<Utc>) {
        self.phase = SessionPhase::Presenting;
        self.item_shown_at = now;
        let index = self.current;
        if let Some(item_id) = self.items.get(index).map(Item::id) {
            let review = self.in_review;
            self.emit(&SessionEvent::ItemPresented {
                index,
                item_id,
                review,
            });
        }
    }

    fn complete(&mut self, now: DateTime<Utc>, timed_out: bool) {
        if self.completed_at.is_some() {
            return;
        }
        self.phase = SessionPhase::Completed;
        self.completed_at = Some(now);
        self.timed_out = timed_out;
        log::info!(
            "session for word set {} completed with {} answers",
            self.word_set_id,
            self.answers.len()
        );
        self.emit(&SessionEvent::Completed { timed_out });
    }

    fn emit(&mut self, event: &SessionEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("word_set_id", &self.word_set_id)
            .field("mode", &self.settings.mode())
            .field("items_len", &self.items.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("answers_len", &self.answers.len())
            .field("review_queue", &self.review_queue)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("timed_out", &self.timed_out)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::ItemPoolBuilder;
    use chrono::Duration;
    use practice_core::evaluator::EvaluatorError;
    use practice_core::model::{KindSet, Word, WordSet};
    use practice_core::time::fixed_now;
    use std::sync::{Arc, Mutex};

    const A: u64 = 1;
    const B: u64 = 2;

    fn build_set(n: u64) -> WordSet {
        let words = (1..=n)
            .map(|id| Word::new(WordId::new(id), format!("w{id}"), format!("t{id}")))
            .collect();
        WordSet::new(WordSetId::new(1), "Test", words).unwrap()
    }

    fn start(n: u64, settings: SessionSettings) -> PracticeSession {
        let set = build_set(n);
        let plan = ItemPoolBuilder::new(&set, &settings).build().unwrap();
        PracticeSession::start(set.id(), plan, settings, fixed_now()).unwrap()
    }

    fn flashcards(review: bool) -> PracticeSession {
        start(2, SessionSettings::flashcards().with_review_incorrect(review))
    }

    fn typing_quiz(n: u64, time_limit: Option<u32>) -> PracticeSession {
        let settings = SessionSettings::quiz()
            .with_allowed_kinds(KindSet {
                multiple_choice: false,
                typing: true,
            })
            .with_time_limit_secs(time_limit);
        start(n, settings)
    }

    fn current_id(session: &PracticeSession) -> u64 {
        session.current_item().unwrap().id().value()
    }

    fn answer(session: &mut PracticeSession, correct: bool) -> SessionAnswer {
        let response = UserResponse::SelfGrade(correct);
        session.submit_answer(&response, None, fixed_now()).unwrap()
    }

    #[test]
    fn empty_plan_cannot_start() {
        let plan = SessionPlan {
            items: Vec::new(),
            flashcards: 0,
            multiple_choice: 0,
            typing: 0,
        };
        let err = PracticeSession::start(
            WordSetId::new(1),
            plan,
            SessionSettings::flashcards(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::EmptyPool));
    }

    #[test]
    fn linear_flashcards_complete_after_last_item() {
        let mut session = flashcards(false);
        assert_eq!(session.current_index(), 0);
        assert_eq!(current_id(&session), A);

        let first = answer(&mut session, false);
        assert!(!first.queued_for_review);
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionPhase::Presenting);
        assert_eq!(session.current_index(), 1);

        answer(&mut session, true);
        assert!(session.is_flashcard_complete());
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionPhase::Completed);
        assert!(session.is_complete());
        assert_eq!(session.answers().len(), session.items().len());
        assert!(session.current_item().is_none());
    }

    #[test]
    fn incorrect_flashcard_is_reviewed_before_completion() {
        let mut session = flashcards(true);

        let first = answer(&mut session, false);
        assert!(first.queued_for_review);
        assert_eq!(session.review_queue().iter().copied().collect::<Vec<_>>(), vec![WordId::new(A)]);
        session.advance(fixed_now()).unwrap();

        answer(&mut session, true);
        assert!(!session.is_flashcard_complete());
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionPhase::Presenting);
        assert_eq!(session.current_index(), 0);
        assert_eq!(current_id(&session), A);
        assert!(session.is_reviewing());
        assert!(session.review_queue().is_empty());

        answer(&mut session, true);
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionPhase::Completed);
        assert_eq!(session.answers().len(), session.items().len() + 1);
        assert_eq!(session.review_attempts(), 1);
    }

    #[test]
    fn failed_review_is_queued_again() {
        let mut session = flashcards(true);
        answer(&mut session, true);
        session.advance(fixed_now()).unwrap();
        answer(&mut session, false); // B queued
        session.advance(fixed_now()).unwrap();
        assert_eq!(current_id(&session), B);

        let again = answer(&mut session, false);
        assert!(again.queued_for_review);
        session.advance(fixed_now()).unwrap();
        assert_eq!(current_id(&session), B);

        answer(&mut session, true);
        assert_eq!(session.advance(fixed_now()).unwrap(), SessionPhase::Completed);
        let summary = session.build_summary().unwrap();
        assert_eq!(summary.total_answers(), 4);
        assert_eq!(summary.review_attempts(), 2);
        assert_eq!(
            summary.total_answers(),
            summary.total_items() + summary.review_attempts()
        );
    }

    #[test]
    fn transitions_are_guarded_by_phase() {
        let mut session = flashcards(false);
        let err = session.advance(fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NotAnswered));

        answer(&mut session, true);
        let err = session
            .submit_answer(&UserResponse::SelfGrade(true), None, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::NotPresenting));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn empty_typed_answer_blocks_submission() {
        let mut session = typing_quiz(3, None);
        let err = session
            .submit_answer(&UserResponse::typed("  "), None, fixed_now())
            .unwrap_err();
        assert!(err.is_empty_answer());
        assert!(matches!(
            err,
            SessionError::Evaluator(EvaluatorError::EmptyAnswer)
        ));
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn typed_answers_are_scored_and_timed() {
        let mut session = typing_quiz(2, None);
        let later = fixed_now() + Duration::milliseconds(900);
        let result = session
            .submit_answer(&UserResponse::typed(" T1 "), None, later)
            .unwrap();
        assert!(result.record.is_correct());
        assert_eq!(result.record.response_time_ms(), 900);
        assert_eq!(result.difficulty, None);

        session.advance(later).unwrap();
        let next = session
            .submit_answer(&UserResponse::typed("nope"), None, later + Duration::seconds(2))
            .unwrap();
        assert_eq!(next.record.response_time_ms(), 2_000);
        assert!(!next.record.is_correct());
        assert_eq!(session.progress().points, 1);
    }

    #[test]
    fn quiz_never_queues_reviews() {
        let mut session = typing_quiz(2, None);
        let result = session
            .submit_answer(&UserResponse::typed("wrong"), None, fixed_now())
            .unwrap();
        assert!(!result.queued_for_review);
        assert!(session.review_queue().is_empty());
    }

    #[test]
    fn skip_records_incorrect_and_advances() {
        let mut session = typing_quiz(2, None);
        let skipped = session.skip(None, fixed_now()).unwrap();
        assert!(skipped.record.is_skipped());
        assert!(!skipped.record.is_correct());
        assert_eq!(session.phase(), SessionPhase::Presenting);
        assert_eq!(session.current_index(), 1);

        session.skip(None, fixed_now()).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.build_summary().unwrap().skipped(), 2);
    }

    #[test]
    fn skipped_flashcard_is_queued_for_review() {
        let mut session = flashcards(true);
        let skipped = session.skip(None, fixed_now()).unwrap();
        assert!(skipped.queued_for_review);
        assert_eq!(session.review_queue().len(), 1);
    }

    #[test]
    fn timed_quiz_completes_when_time_runs_out() {
        let mut session = typing_quiz(10, Some(1));
        assert_eq!(session.remaining_time(fixed_now()), Some(Duration::seconds(1)));
        assert!(!session.expire_if_due(fixed_now() + Duration::milliseconds(999)));

        let after = fixed_now() + Duration::seconds(1);
        assert!(session.expire_if_due(after));
        assert!(session.is_complete());
        assert!(session.timed_out());
        assert_eq!(session.current_index(), 0);
        assert!(!session.expire_if_due(after + Duration::seconds(1)));

        let summary = session.build_summary().unwrap();
        assert!(summary.timed_out());
        assert_eq!(summary.total_answers(), 0);
        assert_eq!(summary.completed_at(), after);
    }

    #[test]
    fn answers_after_deadline_are_rejected() {
        let mut session = typing_quiz(3, Some(5));
        session
            .submit_answer(&UserResponse::typed("t1"), None, fixed_now())
            .unwrap();

        let late = fixed_now() + Duration::seconds(6);
        let err = session.advance(late).unwrap_err();
        assert!(matches!(err, SessionError::Completed));
        assert!(session.timed_out());
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn finish_ends_early_once() {
        let mut session = typing_quiz(3, None);
        session.finish(fixed_now());
        assert!(session.is_complete());
        assert!(!session.timed_out());
        let first_completion = session.completed_at();

        session.finish(fixed_now() + Duration::seconds(10));
        assert_eq!(session.completed_at(), first_completion);
    }

    #[test]
    fn summary_requires_completion() {
        let session = flashcards(false);
        let err = session.build_summary().unwrap_err();
        assert!(matches!(err, SessionError::NotComplete));
    }

    #[test]
    fn flashcard_difficulty_uses_prior_stats() {
        let mut session = flashcards(false);
        let mut prior = WordStats::new(WordId::new(A));
        prior.times_shown = 1;
        prior.times_correct = 0;
        let result = session
            .submit_answer(&UserResponse::SelfGrade(true), Some(&prior), fixed_now())
            .unwrap();
        assert_eq!(result.difficulty, Some(Difficulty::Medium));
    }

    #[test]
    fn listener_sees_every_transition() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut session = flashcards(true).with_listener(Box::new(move |event: &SessionEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        answer(&mut session, false);
        session.advance(fixed_now()).unwrap();
        answer(&mut session, true);
        session.advance(fixed_now()).unwrap();
        answer(&mut session, true);
        session.advance(fixed_now()).unwrap();

        let events = events.lock().unwrap();
        let a = WordId::new(A);
        let b = WordId::new(B);
        assert_eq!(
            *events,
            vec![
                SessionEvent::Answered { item_id: a, is_correct: false },
                SessionEvent::QueuedForReview { item_id: a },
                SessionEvent::ItemPresented { index: 1, item_id: b, review: false },
                SessionEvent::Answered { item_id: b, is_correct: true },
                SessionEvent::ItemPresented { index: 0, item_id: a, review: true },
                SessionEvent::Answered { item_id: a, is_correct: true },
                SessionEvent::Completed { timed_out: false },
            ]
        );
    }
}
