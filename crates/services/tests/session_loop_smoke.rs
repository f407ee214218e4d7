use std::sync::Arc;

use async_trait::async_trait;
use practice_core::evaluator::UserResponse;
use practice_core::model::{
    Direction, KindSet, SessionSettings, Word, WordId, WordSet, WordSetId, WordStats,
};
use practice_core::time::fixed_now;
use services::{Clock, PracticeLoopService, SessionPhase, StatsService};
use storage::repository::{
    InMemoryRepository, StorageError, WordSetRepository, WordStatsRepository,
};

fn animals() -> WordSet {
    WordSet::new(
        WordSetId::new(1),
        "Animals",
        vec![
            Word::new(WordId::new(1), "dog", "pies"),
            Word::new(WordId::new(2), "cat", "kot"),
            Word::new(WordId::new(3), "horse", "koń"),
        ],
    )
    .unwrap()
}

struct BrokenStats;

#[async_trait]
impl WordStatsRepository for BrokenStats {
    async fn get_stats(
        &self,
        _set_id: WordSetId,
        _word_id: WordId,
    ) -> Result<Option<WordStats>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn upsert_stats(&self, _set_id: WordSetId, _stats: &WordStats) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn list_stats(&self, _set_id: WordSetId) -> Result<Vec<WordStats>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn flashcard_loop_reviews_mistakes_and_summarizes() {
    let repo = InMemoryRepository::with_sets([animals()]);
    let loop_svc = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        StatsService::new(Arc::new(repo.clone())),
    );

    let settings = SessionSettings::flashcards().with_review_incorrect(true);
    let mut session = loop_svc.start(WordSetId::new(1), settings).await.unwrap();

    // Miss "horse" on the first pass, know everything else.
    while !session.is_complete() {
        let id = session.current_item().unwrap().id();
        let knew = id != WordId::new(3) || session.is_reviewing();
        loop_svc
            .answer(&mut session, &UserResponse::SelfGrade(knew))
            .await
            .unwrap();
        loop_svc.advance(&mut session).unwrap();
    }

    let summary = loop_svc.finish(&mut session).unwrap();
    assert_eq!(summary.total_items(), 3);
    assert_eq!(summary.total_answers(), 4);
    assert_eq!(summary.review_attempts(), 1);
    assert_eq!(summary.correct(), 3);
    assert!(!summary.timed_out());

    let horse = repo.get_stats(WordSetId::new(1), WordId::new(3)).await.unwrap().unwrap();
    assert_eq!(horse.times_shown, 2);
    assert_eq!(horse.times_incorrect, 1);
    assert!(horse.difficulty.is_some());
}

#[tokio::test]
async fn quiz_loop_survives_stats_outage() {
    let repo = InMemoryRepository::with_sets([animals()]);
    let loop_svc = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        StatsService::new(Arc::new(BrokenStats)),
    );
    let settings = SessionSettings::quiz()
        .with_direction(Direction::Reverse)
        .with_allowed_kinds(KindSet {
            multiple_choice: false,
            typing: true,
        })
        .with_item_limit(Some(2));
    let mut session = loop_svc.start(WordSetId::new(1), settings).await.unwrap();

    let result = loop_svc
        .answer(&mut session, &UserResponse::typed("DOG"))
        .await
        .unwrap();
    assert!(result.answer.record.is_correct());
    assert!(result.stats.is_none());
    assert_eq!(result.phase, SessionPhase::Answered);

    loop_svc.advance(&mut session).unwrap();
    let skipped = loop_svc.skip(&mut session).await.unwrap();
    assert!(skipped.is_complete);

    let summary = session.build_summary().unwrap();
    assert_eq!(summary.points(), 1);
    assert_eq!(summary.max_points(), 2);
    assert_eq!(summary.score_percent(), 50);
    assert_eq!(repo.list_word_sets().await.unwrap().len(), 1);
}
