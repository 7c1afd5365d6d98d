//! Router tests against in-process mock backends.

#![allow(clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use doc_translator_core::config::CacheConfig;
use doc_translator_core::llm::ChatModelInfo;
use doc_translator_core::{
    AppConfig, ChatModel, ChatRequest, DocumentTranslator, DocxDocument, DocxWriter, Error,
    Glossary, GlossaryId, Lang, Result,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use super::router;
use crate::state::{AppState, Backends};

const BOUNDARY: &str = "doc-translator-test-boundary";

/// Returns the uploaded document untouched.
struct EchoDeepl {
    fail: bool,
}

#[async_trait]
impl DocumentTranslator for EchoDeepl {
    async fn create_glossary(&self, _: &str, _: &Lang, _: &Lang, _: &Glossary) -> Result<GlossaryId> {
        Ok(GlossaryId("g".to_string()))
    }

    async fn translate_document(
        &self,
        document: Vec<u8>,
        _filename: &str,
        _source: &Lang,
        _target: &Lang,
        _glossary: Option<&GlossaryId>,
    ) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::DeeplTranslation("Source language not supported".to_string()));
        }
        Ok(document)
    }
}

struct CannedChat {
    fail: bool,
}

#[async_trait]
impl ChatModel for CannedChat {
    fn info(&self) -> ChatModelInfo {
        ChatModelInfo {
            name: "canned",
            requires_api_key: false,
        }
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        if self.fail {
            return Err(Error::LlmRequest("connection refused".to_string()));
        }
        Ok("Improved text.".to_string())
    }
}

fn state_with(deepl_fails: bool, chat_fails: bool) -> (Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.paths.upload_dir = dir.path().join("uploads");
    config.paths.download_dir = dir.path().join("downloads");
    config.paths.data_dir = Some(dir.path().join("data"));
    config.cache = CacheConfig::disabled();

    let backends = Backends {
        translator: Arc::new(EchoDeepl { fail: deepl_fails }),
        chat: Arc::new(CannedChat { fail: chat_fails }),
    };
    (Arc::new(AppState::with_backends(config, backends).unwrap()), dir)
}

pub fn test_state() -> (Arc<AppState>, TempDir) {
    state_with(false, false)
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
    router(Arc::clone(state)).oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut writer = DocxWriter::new();
    for p in paragraphs {
        writer.add_paragraph(*p);
    }
    writer.to_bytes().unwrap()
}

/// Poll a job until it reaches `done` or `error`.
async fn wait_for_job(state: &Arc<AppState>, job_id: &str) -> Value {
    for _ in 0..200 {
        let status = json(send(state, get(&format!("/api/jobs/{job_id}"))).await).await;
        if status["status"] == "done" || status["status"] == "error" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

async fn start_job(state: &Arc<AppState>, document: &[u8]) -> String {
    let response = send(
        state,
        multipart(
            "/api/translate",
            &[
                Part::File("input_file", "report.docx", document),
                Part::Text("source_language", "FR"),
                Part::Text("target_language", "EN-GB"),
                Part::Text("group_size", "2"),
                Part::Text("output_file_name", "report_en.docx"),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let created = json(response).await;
    let job_id = created["job_id"].as_str().unwrap().to_string();
    assert_eq!(created["status_url"], format!("/api/jobs/{job_id}"));
    assert_eq!(created["stream_url"], format!("/api/jobs/{job_id}/stream"));
    job_id
}

// =============================================================================
// Translation Jobs
// =============================================================================

#[tokio::test]
async fn test_translation_job_end_to_end() {
    let (state, _dir) = test_state();
    let job_id = start_job(&state, &docx(&["Bonjour.", "Le devis.", "Merci."])).await;

    let status = wait_for_job(&state, &job_id).await;
    assert_eq!(status["status"], "done");
    assert_eq!(status["output_file_name"], "report_en.docx");

    let latest = json(send(&state, get("/check_status")).await).await;
    assert_eq!(latest, status);

    let response = send(&state, get("/downloads/report_en.docx")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"report_en.docx\"");
    let improved = DocxDocument::from_bytes(&body_bytes(response).await).unwrap();
    assert_eq!(improved.paragraphs(), ["Improved text.", "Improved text."]);

    let history = json(send(&state, get("/api/history")).await).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["file_name"], "report_en.docx");
}

#[tokio::test]
async fn test_job_stream_ends_with_done_event() {
    let (state, _dir) = test_state();
    let job_id = start_job(&state, &docx(&["Bonjour."])).await;
    wait_for_job(&state, &job_id).await;

    let response = send(&state, get(&format!("/api/jobs/{job_id}/stream"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("event: done"));
    assert!(body.contains("\"status\":\"done\""));
}

#[tokio::test]
async fn test_failed_job_reports_stage() {
    let (state, _dir) = state_with(true, false);
    let job_id = start_job(&state, &docx(&["Bonjour."])).await;

    let status = wait_for_job(&state, &job_id).await;
    assert_eq!(status["status"], "error");
    assert!(
        status["message"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: initial translation failed")
    );
    assert!(json(send(&state, get("/api/history")).await).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_translate_rejects_bad_requests() {
    let (state, _dir) = test_state();
    let document = docx(&["Bonjour."]);

    let no_file = multipart("/api/translate", &[Part::Text("source_language", "FR")]);
    assert_eq!(send(&state, no_file).await.status(), StatusCode::BAD_REQUEST);

    let no_target = multipart(
        "/api/translate",
        &[
            Part::File("input_file", "a.docx", &document),
            Part::Text("source_language", "FR"),
        ],
    );
    assert_eq!(send(&state, no_target).await.status(), StatusCode::BAD_REQUEST);

    let bad_output = multipart(
        "/api/translate",
        &[
            Part::File("input_file", "a.docx", &document),
            Part::Text("source_language", "FR"),
            Part::Text("target_language", "EN-GB"),
            Part::Text("output_file_name", "../escape.docx"),
        ],
    );
    assert_eq!(send(&state, bad_output).await.status(), StatusCode::BAD_REQUEST);

    let bad_glossary = multipart(
        "/api/translate",
        &[
            Part::File("input_file", "a.docx", &document),
            Part::File("glossary_csv", "terms.pdf", b"%PDF"),
            Part::Text("source_language", "FR"),
            Part::Text("target_language", "EN-GB"),
        ],
    );
    assert_eq!(send(&state, bad_glossary).await.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.latest_status().await.status, doc_translator_core::JobState::Idle);
}

#[tokio::test]
async fn test_unknown_jobs_and_files() {
    let (state, _dir) = test_state();

    assert_eq!(send(&state, get("/api/jobs/nope")).await.status(), StatusCode::NOT_FOUND);
    let unknown = format!("/api/jobs/{}", uuid::Uuid::new_v4());
    assert_eq!(send(&state, get(&unknown)).await.status(), StatusCode::NOT_FOUND);

    assert_eq!(send(&state, get("/downloads/missing.docx")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&state, get("/downloads/..secret")).await.status(), StatusCode::BAD_REQUEST);

    let idle = json(send(&state, get("/check_status")).await).await;
    assert_eq!(idle["status"], "idle");
}

// =============================================================================
// Tools
// =============================================================================

#[tokio::test]
async fn test_calculator() {
    let (state, _dir) = test_state();
    let document = docx(&["One two three.", "Four five."]);

    let response = send(
        &state,
        multipart(
            "/api/calculator",
            &[
                Part::File("file", "quote.docx", &document),
                Part::Text("group_size", "3"),
                Part::Text("reviewer", "toby"),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let estimate = json(response).await;
    assert_eq!(estimate["words"], 5);
    assert_eq!(estimate["paragraphs"], 2);
    assert_eq!(estimate["reviewer"], "TOBY");

    // Sizes without a measured figure use 3 s per paragraph, 0 included
    let response = send(
        &state,
        multipart(
            "/api/calculator",
            &[
                Part::File("file", "quote.docx", &document),
                Part::Text("group_size", "0"),
                Part::Text("reviewer", "MIKE"),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let estimate = json(response).await;
    assert_eq!(estimate["group_size"], 0);
    let seconds = estimate["translation_seconds"].as_f64().unwrap();
    assert!((seconds - 6.0078).abs() < 1e-9, "{seconds}");

    let bad_reviewer = multipart(
        "/api/calculator",
        &[
            Part::File("file", "quote.docx", &document),
            Part::Text("reviewer", "ALICE"),
        ],
    );
    assert_eq!(send(&state, bad_reviewer).await.status(), StatusCode::BAD_REQUEST);

    let not_docx = multipart(
        "/api/calculator",
        &[Part::File("file", "quote.pdf", b"%PDF"), Part::Text("reviewer", "MIKE")],
    );
    assert_eq!(send(&state, not_docx).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_marketing_fiche() {
    let (state, _dir) = test_state();
    let document = docx(&["A blue widget.", "Fits every pocket."]);

    let response = send(
        &state,
        multipart(
            "/api/marketing",
            &[
                Part::File("file", "brief.docx", &document),
                Part::Text("action", "generate_shopify"),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let links = json(response).await;
    assert_eq!(links["french_pdf"], "/marketing/download/french.pdf");
    assert_eq!(links["english_pdf"], "/marketing/download/english.pdf");

    let pdf = send(&state, get("/marketing/download/english.pdf")).await;
    assert_eq!(pdf.status(), StatusCode::OK);
    assert_eq!(pdf.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(body_bytes(pdf).await.starts_with(b"%PDF"));

    let missing = send(&state, get("/marketing/download/other.pdf")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(missing).await["error"], "File not found");
}

#[tokio::test]
async fn test_marketing_errors() {
    let (state, _dir) = test_state();
    let document = docx(&["A blue widget."]);

    let not_docx = send(
        &state,
        multipart(
            "/api/marketing",
            &[Part::File("file", "brief.pdf", b"%PDF"), Part::Text("action", "generate_commercial")],
        ),
    )
    .await;
    assert_eq!(not_docx.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(not_docx).await["error"],
        "Unsupported file type. Please provide a .docx file."
    );

    let no_action = send(
        &state,
        multipart("/api/marketing", &[Part::File("file", "brief.docx", &document)]),
    )
    .await;
    assert_eq!(no_action.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(no_action).await["error"], "No action specified");

    let unknown = send(
        &state,
        multipart(
            "/api/marketing",
            &[Part::File("file", "brief.docx", &document), Part::Text("action", "generate_poem")],
        ),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let (broken, _dir) = state_with(false, true);
    let failed = send(
        &broken,
        multipart(
            "/api/marketing",
            &[Part::File("file", "brief.docx", &document), Part::Text("action", "generate_commercial")],
        ),
    )
    .await;
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(failed).await["error"].as_str().unwrap().starts_with("Error analysing file: "));
}

// =============================================================================
// System
// =============================================================================

#[tokio::test]
async fn test_health_options_and_disk_usage() {
    let (state, _dir) = test_state();

    assert_eq!(json(send(&state, get("/health")).await).await["status"], "ok");

    let options = json(send(&state, get("/api/options")).await).await;
    assert_eq!(options["default_output_file_name"], "improved_output.docx");
    assert!(
        options["target_languages"]
            .as_array()
            .unwrap()
            .iter()
            .any(|l| l["code"] == "EN-GB")
    );

    let usage = json(send(&state, get("/disk_usage")).await).await;
    assert_eq!(usage["uploads_bytes"], 0);
    assert_eq!(usage["translated_files"], 0);
    for field in ["total", "used", "free"] {
        let value = usage[field].as_str().unwrap();
        assert!(value.ends_with(" GB"), "{field}: {value}");
    }
}
