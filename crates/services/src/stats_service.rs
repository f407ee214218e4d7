use std::sync::Arc;

use practice_core::model::{WordId, WordSetId, WordStats};
use storage::repository::{StorageError, WordStatsRepository};

use crate::sessions::SessionAnswer;

/// Fold one answer into a word's long-lived counters.
///
/// Review attempts count like any other showing. A missing difficulty
/// (quiz items) keeps whatever label the word already had.
#[must_use]
pub fn apply_answer(prior: Option<WordStats>, word_id: WordId, answer: &SessionAnswer) -> WordStats {
    let mut stats = prior.unwrap_or_else(|| WordStats::new(word_id));
    stats.record(
        answer.record.is_correct(),
        answer.difficulty,
        answer.record.answered_at(),
    );
    stats
}

/// Reads and writes per-word practice statistics.
#[derive(Clone)]
pub struct StatsService {
    stats: Arc<dyn WordStatsRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(stats: Arc<dyn WordStatsRepository>) -> Self {
        Self { stats }
    }

    /// Stats recorded so far for a word, `None` if it was never practiced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the repository query fails.
    pub async fn prior(
        &self,
        word_set_id: WordSetId,
        word_id: WordId,
    ) -> Result<Option<WordStats>, StorageError> {
        self.stats.get_stats(word_set_id, word_id).await
    }

    /// Persist an answer against the word's counters and return the new row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read or the write fails.
    pub async fn record(
        &self,
        word_set_id: WordSetId,
        answer: &SessionAnswer,
    ) -> Result<WordStats, StorageError> {
        let word_id = answer.record.item_id();
        let prior = self.stats.get_stats(word_set_id, word_id).await?;
        let updated = apply_answer(prior, word_id, answer);
        self.stats.upsert_stats(word_set_id, &updated).await?;
        log::debug!(
            "stats for word {word_id}: shown {}, correct {}",
            updated.times_shown,
            updated.times_correct
        );
        Ok(updated)
    }

    /// All stats rows for a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the repository query fails.
    pub async fn list(&self, word_set_id: WordSetId) -> Result<Vec<WordStats>, StorageError> {
        self.stats.list_stats(word_set_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{AnswerRecord, Difficulty, Word, WordSet};
    use practice_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, WordSetRepository};

    fn answer(correct: bool, difficulty: Option<Difficulty>) -> SessionAnswer {
        SessionAnswer {
            record: AnswerRecord::new(
                WordId::new(1),
                "pies",
                correct,
                400,
                u32::from(correct),
                fixed_now(),
            ),
            difficulty,
            queued_for_review: false,
        }
    }

    #[test]
    fn first_answer_starts_fresh_counters() {
        let stats = apply_answer(None, WordId::new(1), &answer(false, Some(Difficulty::Hard)));
        assert_eq!(stats.times_shown, 1);
        assert_eq!(stats.times_incorrect, 1);
        assert_eq!(stats.difficulty, Some(Difficulty::Hard));
        assert_eq!(stats.last_practiced_at, Some(fixed_now()));
    }

    #[test]
    fn quiz_answers_keep_existing_difficulty() {
        let first = apply_answer(None, WordId::new(1), &answer(true, Some(Difficulty::Easy)));
        let second = apply_answer(Some(first), WordId::new(1), &answer(false, None));
        assert_eq!(second.times_shown, 2);
        assert_eq!(second.times_correct, 1);
        assert_eq!(second.difficulty, Some(Difficulty::Easy));
    }

    #[tokio::test]
    async fn record_persists_and_accumulates() {
        let repo = Arc::new(InMemoryRepository::new());
        let set = WordSet::new(
            WordSetId::new(1),
            "Animals",
            vec![Word::new(WordId::new(1), "dog", "pies")],
        )
        .unwrap();
        repo.upsert_word_set(&set).await.unwrap();
        let service = StatsService::new(repo);

        service.record(set.id(), &answer(true, Some(Difficulty::Easy))).await.unwrap();
        let updated = service.record(set.id(), &answer(false, None)).await.unwrap();
        assert_eq!(updated.times_shown, 2);

        let stored = service.prior(set.id(), WordId::new(1)).await.unwrap();
        assert_eq!(stored, Some(updated));
        assert_eq!(service.list(set.id()).await.unwrap().len(), 1);
    }
}
