use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{DocumentTranslator, GlossaryId};
use crate::config::{DeeplConfig, Lang};
use crate::error::{Error, Result};
use crate::glossary::Glossary;

/// DeepL answers 456 once the account's character quota is used up.
const QUOTA_EXCEEDED: u16 = 456;

/// Client for the DeepL v2 document and glossary endpoints.
pub struct DeeplClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    poll_interval: Duration,
    max_wait: Duration,
}

/// Handle of an uploaded document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentHandle {
    pub document_id: String,
    pub document_key: String,
}

/// Server-side state of a document job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Queued,
    Translating,
    Done,
    Error,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: DocumentState,
    #[serde(default)]
    seconds_remaining: Option<u64>,
    #[serde(default, alias = "error_message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlossaryResponse {
    glossary_id: String,
}

impl DeeplClient {
    pub fn new(config: &DeeplConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::DeeplRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
        })
    }

    fn auth_header(&self) -> Result<String> {
        self.api_key
            .as_ref()
            .map(|key| format!("DeepL-Auth-Key {key}"))
            .ok_or(Error::DeeplMissingApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Send the document; DeepL starts translating immediately.
    pub async fn upload(
        &self,
        document: Vec<u8>,
        filename: &str,
        source: &Lang,
        target: &Lang,
        glossary: Option<&GlossaryId>,
    ) -> Result<DocumentHandle> {
        let auth = self.auth_header()?;

        let mut form = Form::new()
            .part("file", Part::bytes(document).file_name(filename.to_string()))
            .text("target_lang", target.deepl_code())
            .text("source_lang", source.deepl_code());
        if let Some(id) = glossary {
            form = form.text("glossary_id", id.to_string());
        }

        let response = self
            .client
            .post(self.url("document"))
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::DeeplRequest(e.to_string()))?;

        let response = check_quota(response)?;
        if response.status() != StatusCode::OK {
            return Err(Error::DeeplUpload(body_text(response).await));
        }

        let handle: DocumentHandle = response
            .json()
            .await
            .map_err(|e| Error::DeeplUpload(format!("unexpected response: {e}")))?;
        info!("Document uploaded as {}", handle.document_id);
        Ok(handle)
    }

    /// One status check.
    pub async fn status(&self, handle: &DocumentHandle) -> Result<DocumentState> {
        let auth = self.auth_header()?;
        let response = self
            .client
            .post(self.url(&format!("document/{}", handle.document_id)))
            .header("Authorization", auth)
            .form(&[("document_key", handle.document_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::DeeplRequest(e.to_string()))?;

        let response = check_quota(response)?;
        if !response.status().is_success() {
            return Err(Error::DeeplTranslation(format!(
                "failed to check translation status: {}",
                body_text(response).await
            )));
        }

        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| Error::DeeplTranslation(format!("unexpected status response: {e}")))?;

        if status.status == DocumentState::Error {
            return Err(Error::DeeplTranslation(
                status.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(
            "Document {} is {:?} ({:?}s remaining)",
            handle.document_id, status.status, status.seconds_remaining
        );
        Ok(status.status)
    }

    /// Poll until the document is done, errors, or `max_wait` elapses.
    pub async fn wait_until_done(&self, handle: &DocumentHandle) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.status(handle).await? == DocumentState::Done {
                info!("Document {} translated", handle.document_id);
                return Ok(());
            }
            if started.elapsed() >= self.max_wait {
                warn!("Document {} still unfinished, giving up", handle.document_id);
                return Err(Error::DeeplTimeout(self.max_wait.as_secs()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Fetch the translated file. DeepL only serves it once.
    pub async fn download(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        let auth = self.auth_header()?;
        let response = self
            .client
            .post(self.url(&format!("document/{}/result", handle.document_id)))
            .header("Authorization", auth)
            .form(&[("document_key", handle.document_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::DeeplRequest(e.to_string()))?;

        let response = check_quota(response)?;
        if response.status() != StatusCode::OK {
            return Err(Error::DeeplDownload(body_text(response).await));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::DeeplDownload(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DocumentTranslator for DeeplClient {
    async fn create_glossary(
        &self,
        name: &str,
        source: &Lang,
        target: &Lang,
        glossary: &Glossary,
    ) -> Result<GlossaryId> {
        let auth = self.auth_header()?;
        let entries = glossary.to_deepl_csv();
        let source_code = source.deepl_code();
        let target_code = target.deepl_code();

        let response = self
            .client
            .post(self.url("glossaries"))
            .header("Authorization", auth)
            .form(&[
                ("name", name),
                ("source_lang", source_code.as_str()),
                ("target_lang", target_code.as_str()),
                ("entries_format", "csv"),
                ("entries", entries.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::DeeplRequest(e.to_string()))?;

        let response = check_quota(response)?;
        let status = response.status();
        let body = body_text(response).await;
        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return Err(Error::DeeplGlossary(body));
        }

        let parsed: GlossaryResponse =
            serde_json::from_str(&body).map_err(|_| Error::DeeplGlossary(body.clone()))?;
        info!("Glossary {} created with {} entries", parsed.glossary_id, glossary.len());
        Ok(GlossaryId(parsed.glossary_id))
    }

    async fn translate_document(
        &self,
        document: Vec<u8>,
        filename: &str,
        source: &Lang,
        target: &Lang,
        glossary: Option<&GlossaryId>,
    ) -> Result<Vec<u8>> {
        let handle = self.upload(document, filename, source, target, glossary).await?;
        self.wait_until_done(&handle).await?;
        self.download(&handle).await
    }
}

fn check_quota(response: Response) -> Result<Response> {
    if response.status().as_u16() == QUOTA_EXCEEDED {
        return Err(Error::DeeplQuotaExceeded);
    }
    Ok(response)
}

async fn body_text(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if text.is_empty() {
        format!("HTTP {status}")
    } else {
        text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::extract::{Form as AxumForm, Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str, key: Option<&str>) -> DeeplClient {
        let mut config = DeeplConfig::new(base, key.map(str::to_string));
        config.poll_interval_ms = 1;
        config.max_wait_secs = 5;
        DeeplClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = client("http://127.0.0.1:9", None);
        let err = client
            .translate_document(b"doc".to_vec(), "a.docx", &"FR".into(), &"EN".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeeplMissingApiKey));
    }

    #[tokio::test]
    async fn test_glossary_creation_sends_csv_form() {
        let app = Router::new().route(
            "/glossaries",
            post(|AxumForm(form): AxumForm<HashMap<String, String>>| async move {
                assert_eq!(form["name"], "MyGlossary");
                assert_eq!(form["source_lang"], "FR");
                assert_eq!(form["target_lang"], "EN-GB");
                assert_eq!(form["entries_format"], "csv");
                assert_eq!(form["entries"], "devis,quote\n");
                (AxumStatus::CREATED, Json(serde_json::json!({"glossary_id": "g-1"})))
            }),
        );
        let base = serve(app).await;

        let glossary: Glossary = [("devis", "quote")].into_iter().collect();
        let id = client(&base, Some("k"))
            .create_glossary("MyGlossary", &"fr".into(), &"en-gb".into(), &glossary)
            .await
            .unwrap();
        assert_eq!(id.as_str(), "g-1");
    }

    #[tokio::test]
    async fn test_glossary_rejection_keeps_body() {
        let app = Router::new().route(
            "/glossaries",
            post(|| async { (AxumStatus::BAD_REQUEST, "Unsupported language pair") }),
        );
        let base = serve(app).await;

        let err = client(&base, Some("k"))
            .create_glossary("g", &"FR".into(), &"XX".into(), &Glossary::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeeplGlossary(ref body) if body == "Unsupported language pair"));
    }

    #[tokio::test]
    async fn test_document_flow_polls_until_done() {
        let polls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/document",
                post(|body: axum::body::Bytes| async move {
                    let body = String::from_utf8_lossy(&body);
                    assert!(body.contains("name=\"target_lang\""));
                    assert!(body.contains("name=\"glossary_id\""));
                    Json(serde_json::json!({"document_id": "d1", "document_key": "k1"}))
                }),
            )
            .route(
                "/document/{id}",
                post(
                    |State(polls): State<Arc<AtomicUsize>>,
                     Path(id): Path<String>,
                     AxumForm(form): AxumForm<HashMap<String, String>>| async move {
                        assert_eq!(id, "d1");
                        assert_eq!(form["document_key"], "k1");
                        let status = match polls.fetch_add(1, Ordering::SeqCst) {
                            0 => "queued",
                            1 => "translating",
                            _ => "done",
                        };
                        Json(serde_json::json!({"document_id": "d1", "status": status}))
                    },
                ),
            )
            .route("/document/{id}/result", post(|| async { b"translated".to_vec() }))
            .with_state(polls.clone());
        let base = serve(app).await;

        let bytes = client(&base, Some("k"))
            .translate_document(
                b"PK".to_vec(),
                "in.docx",
                &"FR".into(),
                &"EN".into(),
                Some(&GlossaryId("g-1".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(bytes, b"translated");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let app = Router::new()
            .route(
                "/document",
                post(|| async { Json(serde_json::json!({"document_id": "d", "document_key": "k"})) }),
            )
            .route(
                "/document/{id}",
                post(|| async {
                    Json(serde_json::json!({"status": "error", "message": "Source language not supported"}))
                }),
            );
        let base = serve(app).await;

        let err = client(&base, Some("k"))
            .translate_document(b"PK".to_vec(), "in.docx", &"FR".into(), &"EN".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeeplTranslation(ref m) if m == "Source language not supported"));
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let app = Router::new().route(
            "/document",
            post(|| async { AxumStatus::from_u16(456).unwrap().into_response() }),
        );
        let base = serve(app).await;

        let err = client(&base, Some("k"))
            .upload(b"PK".to_vec(), "in.docx", &"FR".into(), &"EN".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeeplQuotaExceeded));
    }

    #[tokio::test]
    async fn test_polling_gives_up_after_max_wait() {
        let app = Router::new().route(
            "/document/{id}",
            post(|| async { Json(serde_json::json!({"status": "queued"})) }),
        );
        let base = serve(app).await;

        let mut config = DeeplConfig::new(base, Some("k".to_string()));
        config.poll_interval_ms = 5;
        config.max_wait_secs = 0;
        let client = DeeplClient::new(&config).unwrap();
        let handle = DocumentHandle {
            document_id: "d".to_string(),
            document_key: "k".to_string(),
        };

        let err = client.wait_until_done(&handle).await.unwrap_err();
        assert!(matches!(err, Error::DeeplTimeout(0)));
    }
}
