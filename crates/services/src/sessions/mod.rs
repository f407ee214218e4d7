mod countdown;
mod events;
mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use countdown::{Countdown, CountdownTimer, TimerEvent};
pub use events::{SessionEvent, SessionListener};
pub use plan::{ItemPoolBuilder, SessionPlan};
pub use progress::SessionProgress;
pub use service::{PracticeSession, SessionAnswer, SessionPhase};
pub use workflow::{PracticeAnswerResult, PracticeLoopService};
