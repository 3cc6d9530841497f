//! Scripted gateway for tests.
//!
//! Responses are queued up front and consumed in order. Raw model text goes
//! through the same parsers as the real gateway, so malformed output behaves
//! the way it would in production. An exhausted queue answers with
//! [`GatewayError::Upstream`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{parser, AiGateway, CallContext, GatewayError};
use crate::interview::{
    EvaluationReport, GreetingAudio, QuestionSet, RoleDescriptor, TranscriptEntry,
};

#[derive(Default)]
pub struct ScriptedGateway {
    generations: Mutex<VecDeque<Result<(String, String), GatewayError>>>,
    transcriptions: Mutex<VecDeque<Result<String, GatewayError>>>,
    evaluations: Mutex<VecDeque<Result<String, GatewayError>>>,
    greeting: Mutex<Option<Result<GreetingAudio, GatewayError>>>,
    transcribe_delay: Option<Duration>,
    evaluated: Mutex<Vec<Vec<TranscriptEntry>>>,
    generate_calls: AtomicUsize,
    transcribe_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an introduction and a numbered list of `questions`.
    pub fn with_questions(self, introduction: &str, questions: &[&str]) -> Self {
        let raw = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");
        self.with_raw_questions(introduction, &raw)
    }

    /// Queues an introduction and unparsed question text.
    pub fn with_raw_questions(mut self, introduction: &str, raw: &str) -> Self {
        self.generations
            .get_mut()
            .push_back(Ok((introduction.to_string(), raw.to_string())));
        self
    }

    pub fn with_generation_error(mut self, err: GatewayError) -> Self {
        self.generations.get_mut().push_back(Err(err));
        self
    }

    pub fn with_transcriptions(mut self, texts: &[&str]) -> Self {
        let queue = self.transcriptions.get_mut();
        queue.extend(texts.iter().map(|text| Ok(text.to_string())));
        self
    }

    pub fn with_transcription_error(mut self, err: GatewayError) -> Self {
        self.transcriptions.get_mut().push_back(Err(err));
        self
    }

    /// Queues raw evaluation text, parsed on use.
    pub fn with_evaluation(mut self, raw: &str) -> Self {
        self.evaluations.get_mut().push_back(Ok(raw.to_string()));
        self
    }

    pub fn with_evaluation_error(mut self, err: GatewayError) -> Self {
        self.evaluations.get_mut().push_back(Err(err));
        self
    }

    pub fn with_greeting(mut self, greeting: Result<GreetingAudio, GatewayError>) -> Self {
        *self.greeting.get_mut() = Some(greeting);
        self
    }

    pub fn with_transcribe_delay(mut self, delay: Duration) -> Self {
        self.transcribe_delay = Some(delay);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn transcribe_calls(&self) -> usize {
        self.transcribe_calls.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    /// Transcript lists passed to `evaluate`, one per call.
    pub async fn evaluated(&self) -> Vec<Vec<TranscriptEntry>> {
        self.evaluated.lock().await.clone()
    }
}

fn exhausted(call: &str) -> GatewayError {
    GatewayError::Upstream(format!("no scripted {call} response left"))
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "Scripted gateway"
    }

    async fn generate_introduction_and_questions(
        &self,
        _role: &RoleDescriptor,
        ctx: &CallContext,
    ) -> Result<(String, QuestionSet), GatewayError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.generations.lock().await.pop_front();

        ctx.run(async move {
            let (introduction, raw) = next.unwrap_or_else(|| Err(exhausted("generation")))?;
            let questions = parser::parse_questions(&raw)?;
            Ok((introduction, questions))
        })
        .await
    }

    async fn transcribe(
        &self,
        _video: &[u8],
        _mime_type: &str,
        ctx: &CallContext,
    ) -> Result<String, GatewayError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.transcriptions.lock().await.pop_front();
        let delay = self.transcribe_delay;

        ctx.run(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            next.unwrap_or_else(|| Err(exhausted("transcription")))
        })
        .await
    }

    async fn evaluate(
        &self,
        _role: &RoleDescriptor,
        transcripts: &[TranscriptEntry],
        ctx: &CallContext,
    ) -> Result<EvaluationReport, GatewayError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        self.evaluated.lock().await.push(transcripts.to_vec());
        let next = self.evaluations.lock().await.pop_front();

        ctx.run(async move {
            let raw = next.unwrap_or_else(|| Err(exhausted("evaluation")))?;
            parser::parse_evaluation(&raw)
        })
        .await
    }

    async fn synthesize_speech(
        &self,
        _text: &str,
        _ctx: &CallContext,
    ) -> Result<Option<GreetingAudio>, GatewayError> {
        match self.greeting.lock().await.clone() {
            Some(Ok(audio)) => Ok(Some(audio)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
