//! HTTP surface tests driven through the router without binding a socket.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use screener::api::{ApiServer, AppState};
use screener::gateway::{GatewayError, ScriptedGateway};
use screener::interview::{MachineSettings, SessionRegistry};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const BOUNDARY: &str = "screener-test-boundary";
const MAX_UPLOAD: usize = 50 * 1024 * 1024;
const EVALUATION: &str = "Overall Summary: Solid fundamentals.\n\
                          Strengths: Explains trade-offs.\n\
                          Areas for Improvement: <b>Testing</b> depth.";

fn app(gateway: ScriptedGateway) -> Router {
    let registry = SessionRegistry::new(
        Arc::new(gateway),
        MachineSettings::default(),
        false,
        CancellationToken::new(),
    );
    ApiServer::router(AppState::new(registry).unwrap(), MAX_UPLOAD)
}

fn start_request() -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/start_interview")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "role_title=Backend+Engineer&role_description=Builds+REST+APIs",
        ))
        .unwrap()
}

fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"answer.webm\"\r\n\
                     Content-Type: {ct}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn submit_request() -> Request<Body> {
    multipart_request(
        "/submit_response",
        &[("video", Some("video/webm"), "fake clip bytes")],
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_version_endpoint() {
    let app = app(ScriptedGateway::new());
    let (status, body) = send_json(&app, get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "screener");
}

#[tokio::test]
async fn test_start_interview_returns_questions() {
    let app = app(ScriptedGateway::new().with_questions("Welcome!", &["Q1", "Q2", "Q3"]));

    let (status, body) = send_json(&app, start_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["introduction"], "Welcome!");
    assert_eq!(body["questions"], serde_json::json!(["Q1", "Q2", "Q3"]));
    assert!(body["session_id"].is_string());
    assert!(body["greeting_audio"].is_null());
}

#[tokio::test]
async fn test_start_interview_accepts_multipart() {
    let app = app(ScriptedGateway::new().with_questions("Hi", &["Q1"]));

    let request = multipart_request(
        "/start_interview",
        &[
            ("role_title", None, "Data Analyst"),
            ("role_description", None, "SQL and dashboards"),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"][0], "Q1");
}

#[tokio::test]
async fn test_start_interview_rejects_blank_role() {
    let app = app(ScriptedGateway::new().with_questions("Hi", &["Q1"]));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/start_interview")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("role_title=&role_description=Something"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_start_interview_gateway_failure_is_bad_gateway() {
    let app = app(ScriptedGateway::new().with_generation_error(GatewayError::Upstream(
        "quota exceeded".into(),
    )));

    let (status, body) = send_json(&app, start_request()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));

    let (status, _) = send_json(&app, get("/interviews")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_second_start_conflicts() {
    let app = app(
        ScriptedGateway::new()
            .with_questions("Hi", &["Q1"])
            .with_questions("Hi", &["Q1"]),
    );

    let (status, _) = send(&app, start_request()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, start_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_submit_before_start_is_invalid_state() {
    let app = app(ScriptedGateway::new().with_transcriptions(&["A1"]));

    let (status, body) = send_json(&app, submit_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let (_, listed) = send_json(&app, get("/interviews")).await;
    assert_eq!(listed["interviews"], serde_json::json!([]));
}

#[tokio::test]
async fn test_submit_for_unknown_session_is_not_found() {
    let app = app(ScriptedGateway::new().with_transcriptions(&["A1"]));

    let request = multipart_request(
        "/submit_response",
        &[
            ("session_id", None, "6f1c1f0e-9a57-4a8e-9d4b-2b1f4c6f7a10"),
            ("video", Some("video/webm"), "clip"),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_submit_requires_video_field() {
    let app = app(ScriptedGateway::new().with_questions("Hi", &["Q1"]));
    send(&app, start_request()).await;

    let request = multipart_request("/submit_response", &[("question_index", None, "0")]);
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_interview_round_trip_over_http() {
    let app = app(
        ScriptedGateway::new()
            .with_questions("Welcome!", &["Q1", "Q2"])
            .with_transcriptions(&["A1", "A2"])
            .with_evaluation(EVALUATION),
    );

    let (_, started) = send_json(&app, start_request()).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let (status, first) = send_json(&app, submit_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["transcription"], "A1");
    assert_eq!(first["question_index"], 0);
    assert_eq!(first["next_question"], "Q2");
    assert_eq!(first["next_question_index"], 1);
    assert_eq!(first["complete"], false);

    // Not finished yet.
    let (status, html) = send(&app, get("/recruiter_report")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(html.contains("1 of 2 questions answered"));

    let request = multipart_request(
        "/submit_response",
        &[
            ("session_id", None, session_id.as_str()),
            ("question_index", None, "1"),
            ("video", Some("video/webm"), "second clip"),
        ],
    );
    let (status, second) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["transcription"], "A2");
    assert!(second["next_question"].is_null());
    assert_eq!(second["complete"], true);

    let (status, _) = send(&app, submit_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, html) = send(&app, get("/recruiter_report")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Solid fundamentals."));
    assert!(html.contains("Explains trade-offs."));
    assert!(html.contains("&lt;b&gt;Testing&lt;/b&gt;"));
    assert!(html.contains("Backend Engineer"));

    let uri = format!("/recruiter_report?session_id={session_id}&format=json");
    let (status, report) = send_json(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["evaluation"]["strengths"], "Explains trade-offs.");
    assert_eq!(report["transcripts"][1]["transcript_text"], "A2");

    let (status, snapshot) = send_json(&app, get(&format!("/interviews/{session_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["phase"], "complete");
}

#[tokio::test]
async fn test_report_empty_state_without_interview() {
    let app = app(ScriptedGateway::new());

    let (status, html) = send(&app, get("/recruiter_report")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(html.contains("No interview has been started yet."));

    let (status, body) = send_json(&app, get("/recruiter_report?format=json")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("0 of 0 questions answered"));

    let uri = "/recruiter_report?session_id=6f1c1f0e-9a57-4a8e-9d4b-2b1f4c6f7a10";
    let (status, html) = send(&app, get(uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("This interview session does not exist."));
}

#[tokio::test]
async fn test_discard_interview() {
    let app = app(
        ScriptedGateway::new()
            .with_questions("Hi", &["Q1"])
            .with_questions("Hi again", &["Q1"]),
    );

    let (_, started) = send_json(&app, start_request()).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/interviews/{session_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, get(&format!("/interviews/{session_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, start_request()).await;
    assert_eq!(status, StatusCode::OK);
}
