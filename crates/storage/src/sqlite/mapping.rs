use practice_core::model::{Difficulty, WordId, WordSetId};

use crate::repository::StorageError;

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn set_id_to_i64(id: WordSetId) -> Result<i64, StorageError> {
    u64_to_i64("word_set_id", id.value())
}

pub(crate) fn word_id_to_i64(id: WordId) -> Result<i64, StorageError> {
    u64_to_i64("word_id", id.value())
}

pub(crate) fn set_id_from_i64(v: i64) -> Result<WordSetId, StorageError> {
    Ok(WordSetId::new(i64_to_u64("word_set_id", v)?))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(i64_to_u64("word_id", v)?))
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn parse_difficulty(raw: Option<String>) -> Result<Option<Difficulty>, StorageError> {
    raw.map(|s| {
        s.parse::<Difficulty>()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    })
    .transpose()
}
