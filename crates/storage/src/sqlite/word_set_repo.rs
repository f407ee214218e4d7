use practice_core::model::{Word, WordSet, WordSetId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{set_id_from_i64, set_id_to_i64, word_id_from_i64, word_id_to_i64};
use crate::repository::{StorageError, WordSetListing, WordSetRepository};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl WordSetRepository for SqliteRepository {
    async fn upsert_word_set(&self, set: &WordSet) -> Result<(), StorageError> {
        let set_id = set_id_to_i64(set.id())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO word_sets (id, name)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            ",
        )
        .bind(set_id)
        .bind(set.name())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM words WHERE word_set_id = ?1")
            .bind(set_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, word) in set.words().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO words (id, word_set_id, position, word, translation)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(word_id_to_i64(word.id)?)
            .bind(set_id)
            .bind(position)
            .bind(word.word.as_str())
            .bind(word.translation.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_word_set(&self, id: WordSetId) -> Result<WordSet, StorageError> {
        let set_id = set_id_to_i64(id)?;
        let row = sqlx::query("SELECT id, name FROM word_sets WHERE id = ?1")
            .bind(set_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        let name: String = row.try_get("name").map_err(conn)?;

        let rows = sqlx::query(
            r"
            SELECT id, word, translation
            FROM words
            WHERE word_set_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(set_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut words = Vec::with_capacity(rows.len());
        for row in rows {
            let word_id: i64 = row.try_get("id").map_err(conn)?;
            words.push(Word {
                id: word_id_from_i64(word_id)?,
                word: row.try_get("word").map_err(conn)?,
                translation: row.try_get("translation").map_err(conn)?,
            });
        }

        WordSet::new(id, name, words).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_word_sets(&self) -> Result<Vec<WordSetListing>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id AS id, s.name AS name, COUNT(w.id) AS word_count
            FROM word_sets s
            LEFT JOIN words w ON w.word_set_id = s.id
            GROUP BY s.id, s.name
            ORDER BY s.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(conn)?;
                let count: i64 = row.try_get("word_count").map_err(conn)?;
                Ok(WordSetListing {
                    id: set_id_from_i64(id)?,
                    name: row.try_get("name").map_err(conn)?,
                    word_count: usize::try_from(count)
                        .map_err(|_| StorageError::Serialization("word_count".into()))?,
                })
            })
            .collect()
    }
}
