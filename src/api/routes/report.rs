//! Recruiter report endpoint.
//!
//! GET /recruiter_report renders the evaluation as HTML, or as JSON with
//! `format=json`. An unfinished interview yields a 409 with an empty-state
//! page instead of an evaluation.

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use minijinja::{context, Environment};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::api::error::{status_for, ApiError};
use crate::api::state::AppState;
use crate::interview::{EvaluationReport, InterviewError, SessionSnapshot};

const REPORT_TEMPLATE: &str = "recruiter_report.html";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recruiter_report", get(recruiter_report))
        .with_state(state)
}

/// Compiled report templates. HTML output is auto-escaped.
pub struct ReportTemplates {
    env: Environment<'static>,
}

impl ReportTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(
            REPORT_TEMPLATE,
            include_str!("../templates/recruiter_report.html"),
        )?;
        Ok(Self { env })
    }

    pub fn render(
        &self,
        snapshot: Option<&SessionSnapshot>,
        report: Option<&EvaluationReport>,
        message: &str,
    ) -> Result<String, minijinja::Error> {
        let role_title = snapshot
            .and_then(|s| s.state.role.as_ref())
            .map(|role| role.title.clone());
        let transcripts = snapshot.map(|s| s.state.transcripts.clone()).unwrap_or_default();
        let answered = snapshot.map_or(0, |s| s.state.current_index);
        let total = snapshot.map_or(0, |s| s.state.question_count());

        self.env.get_template(REPORT_TEMPLATE)?.render(context! {
            role_title => role_title,
            report => report,
            message => message,
            transcripts => transcripts,
            answered => answered,
            total => total,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub session_id: Option<Uuid>,
    pub format: Option<String>,
}

async fn recruiter_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let wants_json = query
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("json"));

    let (snapshot, result) = match state.registry.resolve(query.session_id).await {
        Ok(machine) => {
            let result = machine.get_report().await;
            (Some(machine.snapshot().await), result)
        }
        Err(e) => (None, Err(e)),
    };

    if let Err(e) = &result {
        warn!("Recruiter report unavailable: {}", e);
    }

    if wants_json {
        return json_response(snapshot, result);
    }

    let (status, message) = match &result {
        Ok(_) => (StatusCode::OK, String::new()),
        Err(e) => (status_for(e), empty_state_message(e)),
    };

    match state
        .templates
        .render(snapshot.as_ref(), result.as_ref().ok(), &message)
    {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render recruiter report: {}", e);
            ApiError::internal("Could not render the recruiter report").into_response()
        }
    }
}

fn json_response(
    snapshot: Option<SessionSnapshot>,
    result: Result<EvaluationReport, InterviewError>,
) -> Response {
    match (snapshot, result) {
        (Some(snapshot), Ok(report)) => Json(json!({
            "session_id": snapshot.session_id,
            "role": snapshot.state.role,
            "evaluation": report,
            "transcripts": snapshot.state.transcripts,
        }))
        .into_response(),
        (_, Err(e)) => ApiError::from(e).into_response(),
        (None, Ok(_)) => ApiError::internal("report produced without a session").into_response(),
    }
}

fn empty_state_message(err: &InterviewError) -> String {
    match err {
        InterviewError::InterviewIncomplete { total: 0, .. } => {
            "No interview has been started yet.".to_string()
        }
        InterviewError::SessionNotFound(_) => "This interview session does not exist.".to_string(),
        InterviewError::InterviewIncomplete { answered, total } => format!(
            "The interview is not finished yet: {answered} of {total} questions answered."
        ),
        _ => "Could not generate the evaluation. Please check the logs and try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_escapes_model_output() {
        let templates = ReportTemplates::new().unwrap();
        let report = EvaluationReport {
            overall_summary: "<script>alert(1)</script>".into(),
            strengths: "Clear".into(),
            areas_for_improvement: "Depth".into(),
        };

        let html = templates.render(None, Some(&report), "").unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Areas for Improvement"));
    }

    #[test]
    fn test_template_empty_state() {
        let templates = ReportTemplates::new().unwrap();
        let html = templates
            .render(None, None, "No interview has been started yet.")
            .unwrap();
        assert!(html.contains("No interview has been started yet."));
        assert!(html.contains("Role: N/A"));
    }

    #[test]
    fn test_empty_state_messages() {
        let msg = empty_state_message(&InterviewError::InterviewIncomplete {
            answered: 2,
            total: 5,
        });
        assert!(msg.contains("2 of 5"));

        let msg = empty_state_message(&InterviewError::InterviewIncomplete {
            answered: 0,
            total: 0,
        });
        assert_eq!(msg, "No interview has been started yet.");
    }
}
