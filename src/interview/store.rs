//! Session state record and the store guarding its shape.
//!
//! The store is not a state machine. It only refuses writes that would break
//! the record's invariants: transcripts are append-only and bound to the
//! current question, the index only moves forward, and the evaluation is
//! recorded once every question has an answer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::InterviewError;
use super::types::{
    CurrentQuestion, EvaluationReport, GreetingAudio, InterviewPhase, QuestionSet,
    RoleDescriptor, TranscriptEntry,
};

/// Everything known about one interview.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub role: Option<RoleDescriptor>,
    pub introduction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting_audio: Option<GreetingAudio>,
    pub questions: Option<QuestionSet>,
    pub transcripts: Vec<TranscriptEntry>,
    pub current_index: usize,
    pub evaluation: Option<EvaluationReport>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn phase(&self) -> InterviewPhase {
        if self.role.is_none() {
            InterviewPhase::Empty
        } else if self.evaluation.is_some() {
            InterviewPhase::Complete
        } else {
            InterviewPhase::Active
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.as_ref().map_or(0, QuestionSet::len)
    }

    pub fn all_answered(&self) -> bool {
        self.questions.is_some() && self.current_index == self.question_count()
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: SessionState,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    pub fn phase(&self) -> InterviewPhase {
        self.state.phase()
    }

    pub fn set_role_and_questions(
        &mut self,
        role: RoleDescriptor,
        introduction: String,
        questions: QuestionSet,
        greeting_audio: Option<GreetingAudio>,
    ) -> Result<(), InterviewError> {
        if self.state.role.is_some() {
            return Err(InterviewError::InvalidState(
                "role and questions are already set".into(),
            ));
        }

        self.state = SessionState {
            role: Some(role),
            introduction: Some(introduction),
            greeting_audio,
            questions: Some(questions),
            transcripts: Vec::new(),
            current_index: 0,
            evaluation: None,
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        Ok(())
    }

    pub fn append_transcript(&mut self, entry: TranscriptEntry) -> Result<(), InterviewError> {
        let total = self.state.question_count();
        if self.state.questions.is_none() {
            return Err(InterviewError::InvalidState(
                "no questions have been generated".into(),
            ));
        }
        if self.state.current_index >= total {
            return Err(InterviewError::InvalidState(
                "all questions have already been answered".into(),
            ));
        }
        if entry.question_index != self.state.current_index {
            return Err(InterviewError::InvalidState(format!(
                "transcript for question {} does not match current question {}",
                entry.question_index, self.state.current_index
            )));
        }

        self.state.transcripts.push(entry);
        self.state.current_index += 1;
        Ok(())
    }

    pub fn current_question(&self) -> CurrentQuestion {
        let index = self.state.current_index;
        match self.state.questions.as_ref().and_then(|q| q.get(index)) {
            Some(text) => CurrentQuestion::Pending {
                index,
                text: text.to_string(),
            },
            None => CurrentQuestion::SessionComplete,
        }
    }

    pub fn set_evaluation(&mut self, report: EvaluationReport) -> Result<(), InterviewError> {
        if !self.state.all_answered() {
            return Err(InterviewError::InterviewIncomplete {
                answered: self.state.current_index,
                total: self.state.question_count(),
            });
        }
        if self.state.evaluation.is_some() {
            return Err(InterviewError::InvalidState(
                "evaluation has already been recorded".into(),
            ));
        }

        self.state.evaluation = Some(report);
        self.state.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}
