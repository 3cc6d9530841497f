use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{audio, parser, prompts, AiGateway, CallContext, GatewayError};
use crate::config::{GeminiConfig, InterviewConfig};
use crate::interview::{
    EvaluationReport, GreetingAudio, QuestionSet, RoleDescriptor, TranscriptEntry,
};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Media { inline_data: InlineData },
    File { file_data: FileData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String, // base64
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// A clip stored through the File API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: String,
    mime_type: Option<String>,
    #[serde(default)]
    state: FileState,
    error: Option<FileError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, Deserialize)]
struct FileError {
    #[serde(default)]
    message: String,
}

/// How a clip reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VideoTransport {
    Inline,
    FileApi,
}

/// JSON framing around the base64 payload of an inline request.
const INLINE_FRAMING_BYTES: usize = 1024;
const FILE_DELETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of an inline transcription request once the clip is base64 encoded.
fn inline_request_size(video_len: usize, prompt_len: usize) -> usize {
    video_len.div_ceil(3) * 4 + prompt_len + INLINE_FRAMING_BYTES
}

fn video_transport(video_len: usize, prompt_len: usize, max_inline: usize) -> VideoTransport {
    if inline_request_size(video_len, prompt_len) <= max_inline {
        VideoTransport::Inline
    } else {
        VideoTransport::FileApi
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    error!("Gemini request failed with status {}: {}", status, body);

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error_response) => GatewayError::Upstream(format!(
            "Gemini API error: {} (code: {:?}, status: {:?})",
            error_response.error.message, error_response.error.code, error_response.error.status
        )),
        Err(_) => GatewayError::Upstream(format!("Gemini request failed with status {status}")),
    }
}

/// Reads a response body, turning non-2xx statuses into errors.
async fn read_body(response: reqwest::Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Upstream(format!("failed to read Gemini response: {e}")))?;

    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(body)
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Result<String, GatewayError> {
        let candidate = self.first_candidate()?;
        Ok(candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<String>())
    }

    /// First audio part, converted to a browser-playable format.
    fn audio(&self) -> Result<Option<GreetingAudio>, GatewayError> {
        let candidate = self.first_candidate()?;
        candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
            .map(|inline| audio::playable_greeting(&inline.mime_type, &inline.data))
            .transpose()
    }

    fn first_candidate(&self) -> Result<&Candidate, GatewayError> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(GatewayError::Upstream(format!(
                "Gemini blocked the prompt: {reason}"
            )));
        }

        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| GatewayError::Upstream("Gemini returned no candidates".to_string()))?;

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" && reason != "MAX_TOKENS" {
                debug!("Gemini candidate finished with reason {}", reason);
            }
        }

        Ok(candidate)
    }
}

/// Strips codec parameters (`video/webm;codecs=vp8`) and checks the media family.
fn normalize_mime_type(mime_type: &str) -> Result<String, GatewayError> {
    let base = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if base.starts_with("video/") || base.starts_with("audio/") {
        Ok(base)
    } else {
        Err(GatewayError::Upstream(format!(
            "unsupported media type: {mime_type}"
        )))
    }
}

pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    config: GeminiConfig,
    min_questions: usize,
    max_questions: usize,
}

impl GeminiGateway {
    pub fn new(
        api_key: String,
        config: &GeminiConfig,
        interview: &InterviewConfig,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("Gemini API key is empty");
        }

        let client = reqwest::Client::new();

        info!(
            "Initialized Gemini gateway with endpoint: {} (model: {})",
            config.endpoint, config.model
        );

        Ok(Self {
            client,
            api_key,
            config: config.clone(),
            min_questions: interview.min_questions,
            max_questions: interview.max_questions,
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, GatewayError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        );

        debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("failed to reach Gemini: {e}")))?;

        let response_text = read_body(response).await?;

        serde_json::from_str(&response_text)
            .map_err(|e| GatewayError::Upstream(format!("failed to parse Gemini response: {e}")))
    }

    async fn complete_text(
        &self,
        prompt: String,
        temperature: f32,
    ) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(temperature),
                ..Default::default()
            }),
        };

        self.generate_content(&self.config.model, &request)
            .await?
            .text()
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), name)
    }

    /// Uploads a clip with the resumable File API protocol.
    async fn upload_file(
        &self,
        video: &[u8],
        mime_type: &str,
    ) -> Result<RemoteFile, GatewayError> {
        let start_url = format!(
            "{}/files",
            self.config.upload_endpoint.trim_end_matches('/')
        );

        debug!("Starting upload of {} byte clip", video.len());

        let response = self
            .client
            .post(&start_url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", video.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": "interview-answer" } }))
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("failed to start upload: {e}")))?;

        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        read_body(response).await?;
        let upload_url = upload_url.ok_or_else(|| {
            GatewayError::Upstream("Gemini did not return an upload URL".to_string())
        })?;

        let response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(video.to_vec())
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("failed to upload clip: {e}")))?;

        let body = read_body(response).await?;
        let uploaded: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Upstream(format!("failed to parse upload response: {e}")))?;

        info!("Uploaded clip as {}", uploaded.file.name);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GatewayError> {
        let response = self
            .client
            .get(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("failed to poll {name}: {e}")))?;

        let body = read_body(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Upstream(format!("failed to parse file status: {e}")))
    }

    /// Polls until the uploaded clip is ready to be referenced.
    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile, GatewayError> {
        loop {
            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    let reason = file.error.map(|e| e.message).unwrap_or_default();
                    return Err(GatewayError::Upstream(format!(
                        "Gemini could not process {}: {}",
                        file.name, reason
                    )));
                }
                FileState::Processing | FileState::Unspecified => {
                    debug!("Waiting for {} to finish processing", file.name);
                    tokio::time::sleep(self.config.file_poll_interval()).await;
                    file = self.get_file(&file.name).await?;
                }
            }
        }
    }

    /// Removes an uploaded clip. Failures are logged and otherwise ignored.
    async fn delete_file(&self, name: &str) {
        let request = self
            .client
            .delete(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .send();

        match tokio::time::timeout(FILE_DELETE_TIMEOUT, request).await {
            Ok(Ok(response)) if response.status().is_success() => {
                debug!("Deleted uploaded file {}", name)
            }
            Ok(Ok(response)) => warn!(
                "Failed to delete uploaded file {}: status {}",
                name,
                response.status()
            ),
            Ok(Err(e)) => warn!("Failed to delete uploaded file {}: {}", name, e),
            Err(_) => warn!("Timed out deleting uploaded file {}", name),
        }
    }

    async fn transcribe_part(&self, media: Part) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: prompts::TRANSCRIBE_PROMPT.to_string(),
                    },
                    media,
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                ..Default::default()
            }),
        };

        self.generate_content(&self.config.model, &request)
            .await?
            .text()
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &'static str {
        "Gemini API"
    }

    async fn generate_introduction_and_questions(
        &self,
        role: &RoleDescriptor,
        ctx: &CallContext,
    ) -> Result<(String, QuestionSet), GatewayError> {
        role.validate()
            .map_err(|e| GatewayError::Generation(e.to_string()))?;

        info!("Generating interview content for role: {}", role.title);

        let temperature = self.config.temperature;
        let intro_prompt = prompts::introduction(role);
        let questions_prompt = prompts::questions(role, self.min_questions, self.max_questions);

        let (introduction, raw_questions) = ctx
            .run(async {
                tokio::try_join!(
                    self.complete_text(intro_prompt, temperature),
                    self.complete_text(questions_prompt, temperature)
                )
            })
            .await?;

        let introduction = introduction.trim().to_string();
        if introduction.is_empty() {
            return Err(GatewayError::Generation(
                "model returned an empty introduction".to_string(),
            ));
        }

        let questions = parser::parse_questions(&raw_questions)?;
        Ok((introduction, questions))
    }

    async fn transcribe(
        &self,
        video: &[u8],
        mime_type: &str,
        ctx: &CallContext,
    ) -> Result<String, GatewayError> {
        let mime_type = normalize_mime_type(mime_type)?;

        if video.is_empty() {
            return Err(GatewayError::Upstream("video clip is empty".to_string()));
        }

        let transport = video_transport(
            video.len(),
            prompts::TRANSCRIBE_PROMPT.len(),
            self.config.max_inline_request_bytes,
        );

        info!(
            "Transcribing {} byte {} clip via {} ({:?})",
            video.len(),
            mime_type,
            self.name(),
            transport
        );

        let text = match transport {
            VideoTransport::Inline => {
                let media = Part::Media {
                    inline_data: InlineData {
                        mime_type,
                        data: BASE64.encode(video),
                    },
                };
                ctx.run(self.transcribe_part(media)).await?
            }
            VideoTransport::FileApi => {
                let file = ctx.run(self.upload_file(video, &mime_type)).await?;
                let name = file.name.clone();

                let result = ctx
                    .run(async {
                        let file = self.wait_until_active(file).await?;
                        let media = Part::File {
                            file_data: FileData {
                                mime_type: file.mime_type.unwrap_or_else(|| mime_type.clone()),
                                file_uri: file.uri,
                            },
                        };
                        self.transcribe_part(media).await
                    })
                    .await;

                self.delete_file(&name).await;
                result?
            }
        };

        let text = text.trim().to_string();
        info!("Transcription complete: {} chars", text.len());
        Ok(text)
    }

    async fn evaluate(
        &self,
        role: &RoleDescriptor,
        transcripts: &[TranscriptEntry],
        ctx: &CallContext,
    ) -> Result<EvaluationReport, GatewayError> {
        info!(
            "Evaluating {} answers for role: {}",
            transcripts.len(),
            role.title
        );

        let prompt = prompts::evaluation(role, transcripts);
        let raw = ctx
            .run(self.complete_text(prompt, self.config.temperature))
            .await?;

        parser::parse_evaluation(&raw).inspect_err(|e| {
            warn!("Evaluation output could not be parsed: {}", e);
            debug!("Raw evaluation: {}", raw);
        })
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        ctx: &CallContext,
    ) -> Result<Option<GreetingAudio>, GatewayError> {
        if !self.config.greeting_audio {
            return Ok(None);
        }

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.tts_voice.clone(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        ctx.run(self.generate_content(&self.config.tts_model, &request))
            .await?
            .audio()
    }
}
