use std::sync::Arc;
use std::time::Duration as StdDuration;

use practice_core::evaluator::UserResponse;
use practice_core::model::{SessionSettings, SessionSummary, WordSetId, WordStats};
use storage::repository::{Storage, WordSetRepository};
use tokio::sync::mpsc::UnboundedSender;

use super::countdown::{CountdownTimer, TimerEvent};
use super::plan::ItemPoolBuilder;
use super::service::{PracticeSession, SessionAnswer, SessionPhase};
use crate::Clock;
use crate::error::SessionError;
use crate::stats_service::StatsService;

/// Result of answering the current item through the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeAnswerResult {
    pub answer: SessionAnswer,
    pub phase: SessionPhase,
    pub is_complete: bool,
    /// Updated stats row, `None` if persisting them failed.
    pub stats: Option<WordStats>,
}

/// Orchestrates session start, answering, and stats persistence.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    word_sets: Arc<dyn WordSetRepository>,
    stats: StatsService,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(clock: Clock, word_sets: Arc<dyn WordSetRepository>, stats: StatsService) -> Self {
        Self {
            clock,
            word_sets,
            stats,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.word_sets),
            StatsService::new(Arc::clone(&storage.stats)),
        )
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load a word set and start a session over it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the set cannot be loaded, plus any
    /// error from building the pool.
    pub async fn start(
        &self,
        word_set_id: WordSetId,
        settings: SessionSettings,
    ) -> Result<PracticeSession, SessionError> {
        let word_set = self.word_sets.get_word_set(word_set_id).await?;
        let plan = ItemPoolBuilder::new(&word_set, &settings).build()?;
        PracticeSession::start(word_set_id, plan, settings, self.clock.now())
    }

    /// Answer the current item and persist the word's stats.
    ///
    /// Stats failures are logged and do not undo the answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for rejected answers or phase violations.
    pub async fn answer(
        &self,
        session: &mut PracticeSession,
        response: &UserResponse,
    ) -> Result<PracticeAnswerResult, SessionError> {
        let prior = self.prior_for_current(session).await;
        let answer = session.submit_answer(response, prior.as_ref(), self.clock.now())?;
        self.finish_answer(session, answer).await
    }

    /// Skip the current item, persist stats, and move on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for phase violations.
    pub async fn skip(
        &self,
        session: &mut PracticeSession,
    ) -> Result<PracticeAnswerResult, SessionError> {
        let prior = self.prior_for_current(session).await;
        let answer = session.skip(prior.as_ref(), self.clock.now())?;
        self.finish_answer(session, answer).await
    }

    /// # Errors
    ///
    /// See [`PracticeSession::advance`].
    pub fn advance(&self, session: &mut PracticeSession) -> Result<SessionPhase, SessionError> {
        session.advance(self.clock.now())
    }

    /// Apply a lapsed time limit. Returns true if this call ended the session.
    pub fn expire(&self, session: &mut PracticeSession) -> bool {
        session.expire_if_due(self.clock.now())
    }

    /// End the session now and return its summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the counts do not add up.
    pub fn finish(&self, session: &mut PracticeSession) -> Result<SessionSummary, SessionError> {
        session.finish(self.clock.now());
        session.build_summary()
    }

    /// Spawn a countdown poller for timed sessions, `None` when untimed.
    #[must_use]
    pub fn start_timer(
        &self,
        session: &PracticeSession,
        tick: StdDuration,
        events: UnboundedSender<TimerEvent>,
    ) -> Option<CountdownTimer> {
        let countdown = session.countdown()?;
        Some(CountdownTimer::spawn(countdown, self.clock, tick, events))
    }

    async fn prior_for_current(&self, session: &PracticeSession) -> Option<WordStats> {
        let item_id = session.current_item()?.id();
        match self.stats.prior(session.word_set_id(), item_id).await {
            Ok(prior) => prior,
            Err(e) => {
                log::warn!("could not load stats for word {item_id}: {e}");
                None
            }
        }
    }

    async fn finish_answer(
        &self,
        session: &PracticeSession,
        answer: SessionAnswer,
    ) -> Result<PracticeAnswerResult, SessionError> {
        let stats = match self.stats.record(session.word_set_id(), &answer).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::warn!(
                    "could not save stats for word {}: {e}",
                    answer.record.item_id()
                );
                None
            }
        };
        Ok(PracticeAnswerResult {
            answer,
            phase: session.phase(),
            is_complete: session.is_complete(),
            stats,
        })
    }
}
