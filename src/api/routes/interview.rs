//! Interview endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting an interview (POST /start_interview)
//! - Submitting a recorded answer (POST /submit_response)
//! - Inspecting sessions (GET /interviews, GET /interviews/:id)
//! - Discarding a session (DELETE /interviews/:id)

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    response::Json,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::interview::{CurrentQuestion, RoleDescriptor};

const DEFAULT_VIDEO_MIME: &str = "video/webm";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start_interview", post(start_interview))
        .route("/submit_response", post(submit_response))
        .route("/interviews", get(list_interviews))
        .route(
            "/interviews/:id",
            get(get_interview).delete(discard_interview),
        )
        .with_state(state)
}

/// Role fields posted by the recruiter form.
#[derive(Debug, Default, Deserialize)]
pub struct StartInterviewForm {
    #[serde(default)]
    pub role_title: String,
    #[serde(default)]
    pub role_description: String,
}

/// Accepts the start form either urlencoded or as multipart `FormData`.
pub struct RoleForm(pub StartInterviewForm);

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S> FromRequest<S> for RoleForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(form) = Form::<StartInterviewForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            return Ok(Self(form));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let mut form = StartInterviewForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?
        {
            let name = field.name().map(str::to_owned);
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            match name.as_deref() {
                Some("role_title") => form.role_title = text,
                Some("role_description") => form.role_description = text,
                _ => {}
            }
        }

        Ok(Self(form))
    }
}

/// Generates the introduction and questions for a new interview.
///
/// # Response
/// `{ session_id, introduction, questions, greeting_audio? }`
async fn start_interview(
    State(state): State<AppState>,
    RoleForm(form): RoleForm,
) -> ApiResult<Json<Value>> {
    info!("Start interview requested for role: {}", form.role_title.trim());

    let role = RoleDescriptor::new(form.role_title, form.role_description)?;
    let (session_id, outcome) = state.registry.start_interview(role).await.map_err(|e| {
        warn!("Failed to start interview: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(json!({
        "session_id": session_id,
        "introduction": outcome.introduction,
        "questions": outcome.questions,
        "greeting_audio": outcome.greeting_audio,
    })))
}

/// Transcribes one recorded answer.
///
/// # Request
/// Multipart fields:
/// - `video`: the recorded clip (webm unless the part says otherwise)
/// - `session_id`: optional, defaults to the current interview
/// - `question_index`: optional, must name the pending question
///
/// # Response
/// `{ transcription, question_index, next_question, next_question_index, complete }`
async fn submit_response(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut video: Option<(Vec<u8>, String)> = None;
    let mut session_id: Option<Uuid> = None;
    let mut question_index: Option<usize> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("video") => {
                let mime_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
                    .unwrap_or(DEFAULT_VIDEO_MIME)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                video = Some((bytes.to_vec(), mime_type));
            }
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                let parsed = Uuid::parse_str(text.trim())
                    .map_err(|_| ApiError::bad_request(format!("invalid session_id: {text}")))?;
                session_id = Some(parsed);
            }
            Some("question_index") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                let parsed = text.trim().parse::<usize>().map_err(|_| {
                    ApiError::bad_request(format!("invalid question_index: {text}"))
                })?;
                question_index = Some(parsed);
            }
            _ => {}
        }
    }

    let (video, mime_type) =
        video.ok_or_else(|| ApiError::bad_request("missing multipart field: video"))?;

    info!(
        "Response received: {} bytes ({}) for session {:?}",
        video.len(),
        mime_type,
        session_id
    );

    let machine = state.registry.resolve(session_id).await?;
    let outcome = machine
        .submit_response(&video, &mime_type, question_index)
        .await
        .map_err(|e| {
            warn!("Failed to process response for session {}: {}", machine.id(), e);
            ApiError::from(e)
        })?;

    let (next_question, next_question_index) = match outcome.next {
        CurrentQuestion::Pending { index, text } => (Some(text), Some(index)),
        CurrentQuestion::SessionComplete => (None, None),
    };

    Ok(Json(json!({
        "session_id": machine.id(),
        "transcription": outcome.transcription,
        "question_index": outcome.question_index,
        "next_question": next_question,
        "next_question_index": next_question_index,
        "complete": next_question_index.is_none(),
    })))
}

async fn list_interviews(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.registry.list().await;
    Json(json!({ "interviews": sessions }))
}

async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let machine = state.registry.get(Some(id)).await?;
    let snapshot = machine.snapshot().await;
    Ok(Json(json!(snapshot)))
}

async fn discard_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.registry.discard(id).await?;
    Ok(Json(json!({ "success": true, "session_id": id })))
}
