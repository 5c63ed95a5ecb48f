mod progress;
mod selector;
mod service;
mod tracker;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use selector::{ItemSelector, Selection};
pub use service::{PracticePhase, PracticeSession};
pub use tracker::SessionTracker;
pub use workflow::{AttemptOutcome, ListeningPrompt, PracticeLoopService, TextAnswer};
