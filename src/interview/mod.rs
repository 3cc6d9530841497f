//! Screening interview sessions.
//!
//! A session moves through EMPTY → ACTIVE → COMPLETE as questions are
//! generated, answers are transcribed and the final evaluation is produced.

pub mod error;
pub mod machine;
pub mod registry;
pub mod store;
pub mod types;

pub use error::InterviewError;
pub use machine::{
    InterviewMachine, MachineSettings, SessionSnapshot, StartOutcome, SubmitOutcome,
};
pub use registry::SessionRegistry;
pub use store::{SessionState, SessionStore};
pub use types::{
    CurrentQuestion, EvaluationReport, GreetingAudio, InterviewPhase, QuestionSet,
    RoleDescriptor, TranscriptEntry,
};
