mod answer;
mod ids;
mod item;
mod session;
mod settings;
mod word;

pub use ids::{ParseIdError, WordId, WordSetId};

pub use answer::{AnswerRecord, Difficulty, ParseDifficultyError, WordStats};
pub use item::{DEFAULT_ITEM_POINTS, Item, ItemError, ItemKind, MAX_DISTRACTORS};
pub use session::{SessionSummary, SummaryCounts, SummaryError};
pub use settings::{Direction, FeedbackPolicy, KindSet, SessionMode, SessionSettings, SettingsError};
pub use word::{Word, WordSet, WordSetError};
