use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies the versioned schema (word sets, words, per-word stats).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: word sets and their words.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS word_sets (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER NOT NULL,
                    word_set_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    word TEXT NOT NULL,
                    translation TEXT NOT NULL,
                    PRIMARY KEY (word_set_id, id),
                    FOREIGN KEY (word_set_id) REFERENCES word_sets(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_words_set_position
                    ON words (word_set_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 1).await?;
        tx.commit().await?;
        log::info!("applied schema migration 1");
    }

    // Version 2: per-word practice stats. Rows survive word-list rewrites,
    // so they reference the set rather than individual words.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS word_stats (
                    word_set_id INTEGER NOT NULL,
                    word_id INTEGER NOT NULL,
                    times_shown INTEGER NOT NULL CHECK (times_shown >= 0),
                    times_correct INTEGER NOT NULL CHECK (times_correct >= 0),
                    times_incorrect INTEGER NOT NULL CHECK (times_incorrect >= 0),
                    difficulty TEXT CHECK (difficulty IN ('easy', 'medium', 'hard')),
                    last_practiced_at TEXT,
                    PRIMARY KEY (word_set_id, word_id),
                    FOREIGN KEY (word_set_id) REFERENCES word_sets(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 2).await?;
        tx.commit().await?;
        log::info!("applied schema migration 2");
    }

    Ok(())
}

async fn mark_applied(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
