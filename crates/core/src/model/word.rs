use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{WordId, WordSetId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordSetError {
    #[error("word set name cannot be empty")]
    EmptyName,

    #[error("word {id} has an empty word or translation")]
    EmptyWord { id: WordId },

    #[error("word {id} appears more than once in the set")]
    DuplicateWord { id: WordId },
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// One English↔Polish pair as delivered by the word-set API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub word: String,
    pub translation: String,
}

impl Word {
    #[must_use]
    pub fn new(id: WordId, word: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            id,
            word: word.into(),
            translation: translation.into(),
        }
    }
}

//
// ─── WORD SET ──────────────────────────────────────────────────────────────────
//

/// An ordered, validated collection of words.
///
/// The session layer only ever sees a snapshot of this value; edits made
/// elsewhere after a session starts do not affect that session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWordSet")]
pub struct WordSet {
    id: WordSetId,
    name: String,
    words: Vec<Word>,
}

#[derive(Deserialize)]
struct RawWordSet {
    id: WordSetId,
    name: String,
    #[serde(default)]
    words: Vec<Word>,
}

impl TryFrom<RawWordSet> for WordSet {
    type Error = WordSetError;

    fn try_from(raw: RawWordSet) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.name, raw.words)
    }
}

impl WordSet {
    /// Creates a validated word set.
    ///
    /// # Errors
    ///
    /// Returns `WordSetError::EmptyName` if the trimmed name is empty,
    /// `WordSetError::EmptyWord` if any word or translation is blank, and
    /// `WordSetError::DuplicateWord` if a word id repeats.
    pub fn new(
        id: WordSetId,
        name: impl Into<String>,
        words: Vec<Word>,
    ) -> Result<Self, WordSetError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WordSetError::EmptyName);
        }

        let mut seen = HashSet::with_capacity(words.len());
        for word in &words {
            if word.word.trim().is_empty() || word.translation.trim().is_empty() {
                return Err(WordSetError::EmptyWord { id: word.id });
            }
            if !seen.insert(word.id) {
                return Err(WordSetError::DuplicateWord { id: word.id });
            }
        }

        Ok(Self { id, name, words })
    }

    #[must_use]
    pub fn id(&self) -> WordSetId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: u64, en: &str, pl: &str) -> Word {
        Word::new(WordId::new(id), en, pl)
    }

    #[test]
    fn rejects_blank_name() {
        let err = WordSet::new(WordSetId::new(1), "  ", vec![]).unwrap_err();
        assert_eq!(err, WordSetError::EmptyName);
    }

    #[test]
    fn rejects_blank_translation() {
        let err = WordSet::new(WordSetId::new(1), "Animals", vec![word(3, "dog", " ")])
            .unwrap_err();
        assert_eq!(err, WordSetError::EmptyWord { id: WordId::new(3) });
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = WordSet::new(
            WordSetId::new(1),
            "Animals",
            vec![word(1, "dog", "pies"), word(1, "cat", "kot")],
        )
        .unwrap_err();
        assert_eq!(err, WordSetError::DuplicateWord { id: WordId::new(1) });
    }

    #[test]
    fn empty_word_list_is_a_valid_set() {
        let set = WordSet::new(WordSetId::new(1), "Draft", vec![]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn deserializes_and_validates_json() {
        let json = r#"{"id":4,"name":"Food","words":[{"id":1,"word":"bread","translation":"chleb"}]}"#;
        let set: WordSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.id(), WordSetId::new(4));
        assert_eq!(set.words()[0].translation, "chleb");

        let bad = r#"{"id":4,"name":"","words":[]}"#;
        assert!(serde_json::from_str::<WordSet>(bad).is_err());
    }
}
