use rand::Rng;
use rand::rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;

use practice_core::evaluator::normalize_answer;
use practice_core::model::{
    Direction, Item, ItemKind, MAX_DISTRACTORS, SessionMode, SessionSettings, SettingsError,
    Word, WordSet,
};

use crate::error::SessionError;

/// Ordered items for one session, plus how many of each kind were produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub items: Vec<Item>,
    pub flashcards: usize,
    pub multiple_choice: usize,
    pub typing: usize,
}

impl SessionPlan {
    /// Total number of items in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn from_items(items: Vec<Item>) -> Self {
        let count = |kind| items.iter().filter(|i| i.kind() == kind).count();
        Self {
            flashcards: count(ItemKind::Flashcard),
            multiple_choice: count(ItemKind::MultipleChoice),
            typing: count(ItemKind::Typing),
            items,
        }
    }
}

/// Turns a word-set snapshot into the ordered items a session walks through.
pub struct ItemPoolBuilder<'a> {
    word_set: &'a WordSet,
    settings: &'a SessionSettings,
}

impl<'a> ItemPoolBuilder<'a> {
    #[must_use]
    pub fn new(word_set: &'a WordSet, settings: &'a SessionSettings) -> Self {
        Self { word_set, settings }
    }

    /// Build using the thread-local RNG.
    ///
    /// # Errors
    ///
    /// See [`ItemPoolBuilder::build_with_rng`].
    pub fn build(self) -> Result<SessionPlan, SessionError> {
        let mut rng = rng();
        self.build_with_rng(&mut rng)
    }

    /// Build with a caller-supplied RNG so tests can seed it.
    ///
    /// - Words are shuffled when `shuffle` is set, then truncated to `item_limit`.
    /// - Quiz items pick a kind uniformly among the allowed kinds, per item.
    /// - Distractors come from the whole word set, not just the truncated pool.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSettings` when the settings do not
    /// validate and `SessionError::EmptyPool` when no items remain.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<SessionPlan, SessionError> {
        self.settings.validate()?;

        let mut words: Vec<&Word> = self.word_set.words().iter().collect();
        if self.settings.shuffle() {
            words.shuffle(rng);
        }
        if let Some(limit) = self.settings.item_limit() {
            words.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        if words.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        let direction = self.settings.direction();
        let points = self.settings.points_per_item();
        let kinds = self.settings.allowed_kinds().kinds();

        let mut items = Vec::with_capacity(words.len());
        for word in words {
            let prompt = direction.prompt(word);
            let answer = direction.answer(word);
            let item = match self.settings.mode() {
                SessionMode::Flashcards => Item::flashcard(word.id, prompt, answer, points),
                SessionMode::Quiz => {
                    let kind = *kinds.choose(rng).ok_or(SettingsError::NoQuestionKinds)?;
                    match kind {
                        ItemKind::MultipleChoice => {
                            let options = self.options_for(word, direction, rng);
                            Item::multiple_choice(word.id, prompt, answer, options, points)?
                        }
                        _ => Item::typing(word.id, prompt, answer, points),
                    }
                }
            };
            items.push(item);
        }

        let plan = SessionPlan::from_items(items);
        log::debug!(
            "built pool of {} items ({} flashcards, {} multiple-choice, {} typing)",
            plan.total(),
            plan.flashcards,
            plan.multiple_choice,
            plan.typing
        );
        Ok(plan)
    }

    /// Correct answer plus up to three distinct distractors.
    fn options_for<R: Rng + ?Sized>(
        &self,
        word: &Word,
        direction: Direction,
        rng: &mut R,
    ) -> Vec<String> {
        let correct = direction.answer(word);
        let mut seen = HashSet::new();
        seen.insert(normalize_answer(correct));

        let candidates: Vec<&str> = self
            .word_set
            .words()
            .iter()
            .filter(|other| other.id != word.id)
            .map(|other| direction.answer(other))
            .filter(|text| seen.insert(normalize_answer(text)))
            .collect();

        let mut options: Vec<String> = candidates
            .choose_multiple(rng, MAX_DISTRACTORS)
            .map(|text| (*text).to_string())
            .collect();

        if self.settings.shuffle_options() {
            options.push(correct.to_string());
            options.shuffle(rng);
        } else {
            options.insert(0, correct.to_string());
        }
        options
    }
}
