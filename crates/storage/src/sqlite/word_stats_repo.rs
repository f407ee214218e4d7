use chrono::{DateTime, Utc};
use practice_core::model::{WordId, WordSetId, WordStats};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{count_from_i64, parse_difficulty, set_id_to_i64, word_id_from_i64, word_id_to_i64};
use crate::repository::{StorageError, WordStatsRepository};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn stats_from_row(row: &SqliteRow) -> Result<WordStats, StorageError> {
    let word_id: i64 = row.try_get("word_id").map_err(conn)?;
    let shown: i64 = row.try_get("times_shown").map_err(conn)?;
    let correct: i64 = row.try_get("times_correct").map_err(conn)?;
    let incorrect: i64 = row.try_get("times_incorrect").map_err(conn)?;
    let difficulty: Option<String> = row.try_get("difficulty").map_err(conn)?;
    let last: Option<DateTime<Utc>> = row.try_get("last_practiced_at").map_err(conn)?;

    Ok(WordStats {
        word_id: word_id_from_i64(word_id)?,
        times_shown: count_from_i64("times_shown", shown)?,
        times_correct: count_from_i64("times_correct", correct)?,
        times_incorrect: count_from_i64("times_incorrect", incorrect)?,
        difficulty: parse_difficulty(difficulty)?,
        last_practiced_at: last,
    })
}

#[async_trait::async_trait]
impl WordStatsRepository for SqliteRepository {
    async fn get_stats(
        &self,
        set_id: WordSetId,
        word_id: WordId,
    ) -> Result<Option<WordStats>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT word_id, times_shown, times_correct, times_incorrect, difficulty, last_practiced_at
            FROM word_stats
            WHERE word_set_id = ?1 AND word_id = ?2
            ",
        )
        .bind(set_id_to_i64(set_id)?)
        .bind(word_id_to_i64(word_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(stats_from_row).transpose()
    }

    async fn upsert_stats(&self, set_id: WordSetId, stats: &WordStats) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO word_stats (
                word_set_id, word_id, times_shown, times_correct, times_incorrect,
                difficulty, last_practiced_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(word_set_id, word_id) DO UPDATE SET
                times_shown = excluded.times_shown,
                times_correct = excluded.times_correct,
                times_incorrect = excluded.times_incorrect,
                difficulty = excluded.difficulty,
                last_practiced_at = excluded.last_practiced_at
            ",
        )
        .bind(set_id_to_i64(set_id)?)
        .bind(word_id_to_i64(stats.word_id)?)
        .bind(i64::from(stats.times_shown))
        .bind(i64::from(stats.times_correct))
        .bind(i64::from(stats.times_incorrect))
        .bind(stats.difficulty.map(|d| d.as_str()))
        .bind(stats.last_practiced_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            _ => conn(e),
        })?;

        Ok(())
    }

    async fn list_stats(&self, set_id: WordSetId) -> Result<Vec<WordStats>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT word_id, times_shown, times_correct, times_incorrect, difficulty, last_practiced_at
            FROM word_stats
            WHERE word_set_id = ?1
            ORDER BY word_id ASC
            ",
        )
        .bind(set_id_to_i64(set_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(stats_from_row).collect()
    }
}
