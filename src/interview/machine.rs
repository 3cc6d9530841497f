//! Interview lifecycle orchestrator.
//!
//! Drives one interview through EMPTY → ACTIVE → COMPLETE:
//! start → submit (once per question) → report
//!
//! Every operation first asks [`plan`] whether the command is legal in the
//! current state, then performs the AI call, then commits the result. A
//! failed call commits nothing, so the same command can simply be retried.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, InterviewConfig};
use crate::gateway::{AiGateway, CallContext};

use super::error::InterviewError;
use super::store::{SessionState, SessionStore};
use super::types::{
    CurrentQuestion, EvaluationReport, GreetingAudio, InterviewPhase, QuestionSet,
    RoleDescriptor, TranscriptEntry,
};

/// Knobs the machine needs from configuration.
#[derive(Debug, Clone)]
pub struct MachineSettings {
    pub call_timeout: Duration,
    pub min_questions: usize,
    pub max_questions: usize,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self::from_parts(Duration::from_secs(120), &InterviewConfig::default())
    }
}

impl MachineSettings {
    pub fn from_parts(call_timeout: Duration, interview: &InterviewConfig) -> Self {
        Self {
            call_timeout,
            min_questions: interview.min_questions,
            max_questions: interview.max_questions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_parts(config.gemini.request_timeout(), &config.interview)
    }
}

/// Result of a successful start.
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub introduction: String,
    pub questions: QuestionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting_audio: Option<GreetingAudio>,
}

/// Result of a successful answer submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub question_index: usize,
    pub transcription: String,
    pub next: CurrentQuestion,
}

/// Read-only view of a session for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: InterviewPhase,
    #[serde(flatten)]
    pub state: SessionState,
}

enum Command {
    Start,
    Submit { target: Option<usize> },
    Report,
}

enum Transition {
    Generate,
    Transcribe {
        index: usize,
        question: String,
    },
    Evaluate {
        role: RoleDescriptor,
        transcripts: Vec<TranscriptEntry>,
    },
    Cached(EvaluationReport),
}

/// Decides what a command means in the given state.
fn plan(state: &SessionState, command: Command) -> Result<Transition, InterviewError> {
    let phase = state.phase();
    match command {
        Command::Start => match phase {
            InterviewPhase::Empty => Ok(Transition::Generate),
            InterviewPhase::Active | InterviewPhase::Complete => {
                Err(InterviewError::SessionConflict)
            }
        },
        Command::Submit { target } => {
            if phase != InterviewPhase::Active {
                return Err(InterviewError::InvalidState(format!(
                    "cannot submit a response while the interview is {}",
                    phase.as_str()
                )));
            }

            let index = state.current_index;
            let Some(question) = state.questions.as_ref().and_then(|q| q.get(index)) else {
                return Err(InterviewError::InvalidState(
                    "all questions have already been answered".into(),
                ));
            };

            if let Some(target) = target {
                if target != index {
                    return Err(InterviewError::InvalidState(format!(
                        "response targets question {target} but question {index} is pending"
                    )));
                }
            }

            Ok(Transition::Transcribe {
                index,
                question: question.to_string(),
            })
        }
        Command::Report => {
            if let Some(report) = &state.evaluation {
                return Ok(Transition::Cached(report.clone()));
            }

            match (&state.role, state.all_answered()) {
                (Some(role), true) => Ok(Transition::Evaluate {
                    role: role.clone(),
                    transcripts: state.transcripts.clone(),
                }),
                _ => Err(InterviewError::InterviewIncomplete {
                    answered: state.current_index,
                    total: state.question_count(),
                }),
            }
        }
    }
}

pub struct InterviewMachine {
    id: Uuid,
    gateway: Arc<dyn AiGateway>,
    settings: MachineSettings,
    cancel: CancellationToken,
    store: RwLock<SessionStore>,
    transition: Mutex<()>,
}

impl InterviewMachine {
    pub fn new(
        id: Uuid,
        gateway: Arc<dyn AiGateway>,
        settings: MachineSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            gateway,
            settings,
            cancel,
            store: RwLock::new(SessionStore::new()),
            transition: Mutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn call_context(&self) -> CallContext {
        CallContext::new(self.settings.call_timeout, self.cancel.child_token())
    }

    pub async fn phase(&self) -> InterviewPhase {
        self.store.read().await.phase()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.store.read().await.snapshot();
        SessionSnapshot {
            session_id: self.id,
            phase: state.phase(),
            state,
        }
    }

    pub async fn current_question(&self) -> CurrentQuestion {
        self.store.read().await.current_question()
    }

    /// EMPTY → ACTIVE. Leaves the session EMPTY on any failure.
    pub async fn start_interview(
        &self,
        role: RoleDescriptor,
    ) -> Result<StartOutcome, InterviewError> {
        role.validate()?;
        let _guard = self.transition.lock().await;

        let Transition::Generate = plan(self.store.read().await.state(), Command::Start)? else {
            return Err(InterviewError::InvalidState("unexpected start transition".into()));
        };

        info!("Interview {}: generating questions for {}", self.id, role.title);

        let ctx = self.call_context();
        let (introduction, questions) = self
            .gateway
            .generate_introduction_and_questions(&role, &ctx)
            .await?;

        let count = questions.len();
        if count < self.settings.min_questions || count > self.settings.max_questions {
            warn!(
                "Interview {}: model returned {} questions (expected {}-{}), accepting anyway",
                self.id, count, self.settings.min_questions, self.settings.max_questions
            );
        }

        let greeting_audio = match self.gateway.synthesize_speech(&introduction, &ctx).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(
                    "Interview {}: greeting audio failed, continuing without it: {}",
                    self.id, e
                );
                None
            }
        };

        self.store.write().await.set_role_and_questions(
            role,
            introduction.clone(),
            questions.clone(),
            greeting_audio.clone(),
        )?;

        info!("Interview {} started with {} questions", self.id, count);

        Ok(StartOutcome {
            introduction,
            questions,
            greeting_audio,
        })
    }

    /// Transcribes the answer to the pending question and advances by one.
    ///
    /// `target_index`, when given, must name the pending question.
    pub async fn submit_response(
        &self,
        video: &[u8],
        mime_type: &str,
        target_index: Option<usize>,
    ) -> Result<SubmitOutcome, InterviewError> {
        let _guard = self.transition.lock().await;

        let transition = plan(
            self.store.read().await.state(),
            Command::Submit {
                target: target_index,
            },
        )?;
        let Transition::Transcribe { index, question } = transition else {
            return Err(InterviewError::InvalidState("unexpected submit transition".into()));
        };

        info!("Interview {}: transcribing answer to question {}", self.id, index);

        let transcription = self
            .gateway
            .transcribe(video, mime_type, &self.call_context())
            .await?;

        if transcription.is_empty() {
            warn!("Interview {}: no speech detected for question {}", self.id, index);
        }

        let mut store = self.store.write().await;
        store.append_transcript(TranscriptEntry {
            question_index: index,
            question_text: question,
            transcript_text: transcription.clone(),
        })?;

        Ok(SubmitOutcome {
            question_index: index,
            transcription,
            next: store.current_question(),
        })
    }

    /// Evaluates a fully answered interview once; later calls return the cached report.
    pub async fn get_report(&self) -> Result<EvaluationReport, InterviewError> {
        let _guard = self.transition.lock().await;

        let (role, transcripts) = match plan(self.store.read().await.state(), Command::Report)? {
            Transition::Cached(report) => return Ok(report),
            Transition::Evaluate { role, transcripts } => (role, transcripts),
            _ => {
                return Err(InterviewError::InvalidState(
                    "unexpected report transition".into(),
                ))
            }
        };

        info!(
            "Interview {}: evaluating {} answers",
            self.id,
            transcripts.len()
        );

        let report = self
            .gateway
            .evaluate(&role, &transcripts, &self.call_context())
            .await?;

        self.store.write().await.set_evaluation(report.clone())?;
        info!("Interview {} complete", self.id);

        Ok(report)
    }

    /// Clears the session back to EMPTY.
    pub async fn reset(&self) {
        let _guard = self.transition.lock().await;
        self.store.write().await.reset();
    }
}
