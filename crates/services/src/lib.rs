#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;
pub mod stats_service;

pub use practice_core::Clock;
pub use sessions as session;

pub use error::SessionError;
pub use stats_service::StatsService;

pub use sessions::{
    Countdown, CountdownTimer, ItemPoolBuilder, PracticeAnswerResult, PracticeLoopService,
    PracticeSession, SessionAnswer, SessionEvent, SessionPhase, SessionPlan, SessionProgress,
    TimerEvent,
};
