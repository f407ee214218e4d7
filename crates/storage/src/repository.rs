use async_trait::async_trait;
use practice_core::model::{WordId, WordSet, WordSetId, WordStats};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("http error: {0}")]
    Http(String),
}

/// Lightweight listing entry for word-set pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSetListing {
    pub id: WordSetId,
    pub name: String,
    pub word_count: usize,
}

impl WordSetListing {
    #[must_use]
    pub fn from_set(set: &WordSet) -> Self {
        Self {
            id: set.id(),
            name: set.name().to_owned(),
            word_count: set.len(),
        }
    }
}

/// Source of word sets, fetched once before a session is built.
#[async_trait]
pub trait WordSetRepository: Send + Sync {
    /// Persist or replace a word set together with its words.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn upsert_word_set(&self, set: &WordSet) -> Result<(), StorageError>;

    /// Fetch a word set by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_word_set(&self, id: WordSetId) -> Result<WordSet, StorageError>;

    /// List available word sets ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_word_sets(&self) -> Result<Vec<WordSetListing>, StorageError>;
}

/// Per-word practice counters, written best-effort after each answer.
#[async_trait]
pub trait WordStatsRepository: Send + Sync {
    /// Fetch stats for one word, `None` if it was never practiced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_stats(
        &self,
        set_id: WordSetId,
        word_id: WordId,
    ) -> Result<Option<WordStats>, StorageError>;

    /// Persist or replace stats for one word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stats cannot be stored.
    async fn upsert_stats(&self, set_id: WordSetId, stats: &WordStats) -> Result<(), StorageError>;

    /// All stats recorded for a set, ordered by word ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_stats(&self, set_id: WordSetId) -> Result<Vec<WordStats>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sets: Arc<Mutex<HashMap<WordSetId, WordSet>>>,
    stats: Arc<Mutex<HashMap<(WordSetId, WordId), WordStats>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-populated with the given word sets.
    #[must_use]
    pub fn with_sets(sets: impl IntoIterator<Item = WordSet>) -> Self {
        let map = sets.into_iter().map(|set| (set.id(), set)).collect();
        Self {
            sets: Arc::new(Mutex::new(map)),
            stats: Arc::default(),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl WordSetRepository for InMemoryRepository {
    async fn upsert_word_set(&self, set: &WordSet) -> Result<(), StorageError> {
        let mut guard = self.sets.lock().map_err(poisoned)?;
        guard.insert(set.id(), set.clone());
        Ok(())
    }

    async fn get_word_set(&self, id: WordSetId) -> Result<WordSet, StorageError> {
        let guard = self.sets.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_word_sets(&self) -> Result<Vec<WordSetListing>, StorageError> {
        let guard = self.sets.lock().map_err(poisoned)?;
        let mut listings: Vec<_> = guard.values().map(WordSetListing::from_set).collect();
        listings.sort_by_key(|l| l.id);
        Ok(listings)
    }
}

#[async_trait]
impl WordStatsRepository for InMemoryRepository {
    async fn get_stats(
        &self,
        set_id: WordSetId,
        word_id: WordId,
    ) -> Result<Option<WordStats>, StorageError> {
        let guard = self.stats.lock().map_err(poisoned)?;
        Ok(guard.get(&(set_id, word_id)).cloned())
    }

    async fn upsert_stats(&self, set_id: WordSetId, stats: &WordStats) -> Result<(), StorageError> {
        let mut guard = self.stats.lock().map_err(poisoned)?;
        guard.insert((set_id, stats.word_id), stats.clone());
        Ok(())
    }

    async fn list_stats(&self, set_id: WordSetId) -> Result<Vec<WordStats>, StorageError> {
        let guard = self.stats.lock().map_err(poisoned)?;
        let mut stats: Vec<_> = guard
            .iter()
            .filter(|((set, _), _)| *set == set_id)
            .map(|(_, s)| s.clone())
            .collect();
        stats.sort_by_key(|s| s.word_id);
        Ok(stats)
    }
}

/// Aggregates word-set and stats repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub word_sets: Arc<dyn WordSetRepository>,
    pub stats: Arc<dyn WordStatsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let word_sets: Arc<dyn WordSetRepository> = Arc::new(repo.clone());
        let stats: Arc<dyn WordStatsRepository> = Arc::new(repo);
        Self { word_sets, stats }
    }
}
