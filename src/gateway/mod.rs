//! AI gateway: the three model calls an interview depends on.
//!
//! Implementations are stateless. Every call carries a [`CallContext`] so the
//! caller decides how long to wait and when to give up; the gateway turns an
//! expired deadline into [`GatewayError::Upstream`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::interview::{
    EvaluationReport, GreetingAudio, QuestionSet, RoleDescriptor, TranscriptEntry,
};

pub mod audio;
pub mod gemini;
pub mod mock;
pub mod parser;
pub mod prompts;

pub use gemini::GeminiGateway;
pub use mock::ScriptedGateway;
pub use parser::{parse_evaluation, parse_questions};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The call itself failed: transport, auth, quota, timeout, unsupported media.
    #[error("upstream AI call failed: {0}")]
    Upstream(String),

    /// The model answered but no questions could be parsed from it.
    #[error("question generation failed: {0}")]
    Generation(String),

    /// The evaluation is missing one of its required sections.
    #[error("could not parse evaluation: {0}")]
    Parse(String),

    #[error("AI call was cancelled")]
    Cancelled,
}

/// Per-call deadline and cancellation.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// Runs `fut` under this context's deadline and cancellation token.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GatewayError::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(GatewayError::Upstream(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))),
            },
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(Duration::from_secs(120), CancellationToken::new())
    }
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produces the spoken introduction and the ordered questions for a role.
    async fn generate_introduction_and_questions(
        &self,
        role: &RoleDescriptor,
        ctx: &CallContext,
    ) -> Result<(String, QuestionSet), GatewayError>;

    /// Returns only the spoken words in the clip. An empty string is valid.
    async fn transcribe(
        &self,
        video: &[u8],
        mime_type: &str,
        ctx: &CallContext,
    ) -> Result<String, GatewayError>;

    /// Scores a complete interview. `transcripts` is never empty.
    async fn evaluate(
        &self,
        role: &RoleDescriptor,
        transcripts: &[TranscriptEntry],
        ctx: &CallContext,
    ) -> Result<EvaluationReport, GatewayError>;

    /// Reads the introduction aloud. Callers treat failure as "no audio".
    async fn synthesize_speech(
        &self,
        _text: &str,
        _ctx: &CallContext,
    ) -> Result<Option<GreetingAudio>, GatewayError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_context_passes_result_through() {
        let ctx = CallContext::default();
        let result = ctx.run(async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_call_context_times_out_as_upstream() {
        let ctx = CallContext::new(Duration::from_millis(10), CancellationToken::new());
        let result: Result<(), _> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_call_context_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::new(Duration::from_secs(5), token);
        let result: Result<(), _> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(GatewayError::Cancelled));
    }
}
