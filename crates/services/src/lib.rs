#![forbid(unsafe_code)]

pub mod data_cache;
pub mod dialogue;
pub mod error;
pub mod numbers;
pub mod recorder;
pub mod sessions;

pub use lingua_core::Clock;

pub use data_cache::{DataCache, ResourceState};
pub use dialogue::{
    DialogueJudge, DialogueOutcome, DialoguePracticeService, DialogueReply, DialogueSession,
    DialogueStage, InterlocutorDetails, LlmDialogueJudge,
};
pub use error::{DialoguePracticeError, NumberPracticeError, SessionError};
pub use numbers::{LlmNumberJudge, NumberJudge, NumberOutcome, NumberPracticeService};
pub use recorder::{ExerciseRecorder, RecordOutcome};

pub use sessions::{
    AttemptOutcome, ListeningPrompt, PracticeLoopService, PracticePhase, PracticeSession,
    SessionProgress, SessionTracker, TextAnswer,
};
