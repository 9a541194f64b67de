//! `ProfileGenerator` speaking to the remote generation service over HTTP.
//!
//! Endpoints (relative to the configured base URL):
//!   POST /regenerate   → `{status: "ok", data}` | `{status: "error", error}`
//!   POST /tailor       → `{success: true, tailoredDocument}` | `{success: false, error}`
//!   POST /generate_cv  → multipart form; inline `summary` or a downloadable artifact
//!   GET  /download_cv  → the most recently generated artifact

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::generation::generator::{
    classify_status, ArtifactFetch, ArtifactHandle, FieldRegenerationRequest, GenerateCvRequest,
    GeneratedCv, GenerationError, ProfileGenerator, TailorRequest,
};

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum RegenerateEnvelope {
    Ok { data: Value },
    Error { error: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TailorEnvelope {
    success: bool,
    #[serde(default)]
    tailored_document: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateCvEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

pub struct GenerationServiceClient {
    client: Client,
    base_url: String,
}

impl GenerationServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Where the service keeps the latest artifact when no handle was returned.
    fn default_artifact(&self) -> ArtifactHandle {
        ArtifactHandle(self.url("download_cv"))
    }
}

/// Turns a non-success response into an error, preferring the service's own message.
async fn read_failure(response: Response) -> GenerationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.or(b.detail))
        .unwrap_or(body);
    warn!("Generation service returned {status}: {message}");
    classify_status(status, message)
}

fn malformed(e: serde_json::Error) -> GenerationError {
    GenerationError::Malformed(e.to_string())
}

#[async_trait]
impl ProfileGenerator for GenerationServiceClient {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn regenerate_field(
        &self,
        request: &FieldRegenerationRequest,
    ) -> Result<Value, GenerationError> {
        let response = self
            .client
            .post(self.url("regenerate"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<RegenerateEnvelope>(&body).map_err(malformed)? {
            RegenerateEnvelope::Ok { data } => Ok(data),
            RegenerateEnvelope::Error { error } => Err(GenerationError::Remote(error)),
        }
    }

    async fn tailor(&self, request: &TailorRequest) -> Result<Value, GenerationError> {
        let response = self
            .client
            .post(self.url("tailor"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let body = response.bytes().await?;
        let envelope: TailorEnvelope = serde_json::from_slice(&body).map_err(malformed)?;
        match envelope {
            TailorEnvelope {
                success: true,
                tailored_document: Some(document),
                ..
            } => Ok(document),
            TailorEnvelope { success: true, .. } => Err(GenerationError::Malformed(
                "tailoring succeeded without a document".to_string(),
            )),
            TailorEnvelope { error, .. } => Err(GenerationError::Remote(
                error.unwrap_or_else(|| "tailoring failed".to_string()),
            )),
        }
    }

    async fn generate_cv(
        &self,
        request: &GenerateCvRequest,
    ) -> Result<GeneratedCv, GenerationError> {
        let form = Form::new()
            .text("title", request.title.clone())
            .text("skills", request.skills.clone())
            .text("experience", request.experience_text.clone())
            .text("phone", request.phone.clone());

        let response = self
            .client
            .post(self.url("generate_cv"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        // Some deployments answer with the file itself rather than JSON.
        let body = response.bytes().await?;
        let envelope: GenerateCvEnvelope = serde_json::from_slice(&body).unwrap_or_default();
        if envelope.success == Some(false) {
            return Err(GenerationError::Remote(
                envelope
                    .error
                    .unwrap_or_else(|| "Failed to generate CV".to_string()),
            ));
        }

        match envelope.summary {
            Some(summary) if !summary.trim().is_empty() => Ok(GeneratedCv::Summary(summary)),
            _ => {
                let handle = envelope
                    .download_url
                    .map(ArtifactHandle)
                    .unwrap_or_else(|| self.default_artifact());
                debug!("Generated CV artifact at {}", handle.0);
                Ok(GeneratedCv::Artifact(handle))
            }
        }
    }

    async fn fetch_artifact(
        &self,
        handle: Option<&ArtifactHandle>,
    ) -> Result<ArtifactFetch, GenerationError> {
        let url = handle
            .cloned()
            .unwrap_or_else(|| self.default_artifact())
            .0;
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(ArtifactFetch::NotGenerated),
            status if status.is_success() => Ok(ArtifactFetch::Ready(response.bytes().await?)),
            _ => Err(read_failure(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::generator::GenerationContext;
    use crate::regeneration::target::RegenerableField;
    use crate::testing::serve;
    use axum::http::{header, HeaderMap, StatusCode as Status};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn client(base: &str) -> GenerationServiceClient {
        GenerationServiceClient::new(base, Duration::from_secs(5)).unwrap()
    }

    fn summary_request() -> FieldRegenerationRequest {
        FieldRegenerationRequest {
            session_id: "s-1".into(),
            field_key: RegenerableField::Summary,
            index: None,
            current: json!("old"),
            context: GenerationContext::default(),
        }
    }

    #[tokio::test]
    async fn test_regenerate_unwraps_ok_envelope() {
        let base = serve(Router::new().route(
            "/regenerate",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"status": "ok", "data": format!("new for {}", body["sessionId"].as_str().unwrap_or_default())}))
            }),
        ))
        .await;

        let value = client(&base)
            .regenerate_field(&summary_request())
            .await
            .unwrap();
        assert_eq!(value, json!("new for s-1"));
    }

    #[tokio::test]
    async fn test_regenerate_error_envelope_is_remote_failure() {
        let base = serve(Router::new().route(
            "/regenerate",
            post(|| async { Json(json!({"status": "error", "error": "model offline"})) }),
        ))
        .await;

        let err = client(&base)
            .regenerate_field(&summary_request())
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Remote("model offline".into()));
    }

    #[tokio::test]
    async fn test_rate_limit_and_quota_statuses_are_classified() {
        let base = serve(
            Router::new()
                .route(
                    "/regenerate",
                    post(|| async { (Status::TOO_MANY_REQUESTS, Json(json!({"error": "slow down"}))) }),
                )
                .route(
                    "/tailor",
                    post(|| async { (Status::PAYMENT_REQUIRED, Json(json!({"error": "credits"}))) }),
                ),
        )
        .await;
        let client = client(&base);

        assert_eq!(
            client.regenerate_field(&summary_request()).await.unwrap_err(),
            GenerationError::RateLimited
        );
        let tailor = TailorRequest {
            session_id: "sample".into(),
            job_title: "SRE".into(),
            current_document: Default::default(),
        };
        assert_eq!(
            client.tailor(&tailor).await.unwrap_err(),
            GenerationError::QuotaExhausted
        );
    }

    #[tokio::test]
    async fn test_tailor_reads_tailored_document() {
        let base = serve(Router::new().route(
            "/tailor",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"success": true, "tailoredDocument": {"title": body["jobTitle"]}}))
            }),
        ))
        .await;

        let document = client(&base)
            .tailor(&TailorRequest {
                session_id: "sample".into(),
                job_title: "SRE".into(),
                current_document: Default::default(),
            })
            .await
            .unwrap();
        assert_eq!(document["title"], "SRE");
    }

    #[tokio::test]
    async fn test_generate_cv_sends_form_and_defaults_artifact_location() {
        let base = serve(Router::new().route(
            "/generate_cv",
            post(|headers: HeaderMap, body: String| async move {
                let is_form = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.starts_with("multipart/form-data"));
                if is_form && body.contains("Acme") {
                    (Status::OK, "%PDF-1.4".to_string())
                } else {
                    (Status::BAD_REQUEST, r#"{"detail": "bad form"}"#.to_string())
                }
            }),
        ))
        .await;

        let generated = client(&base)
            .generate_cv(&GenerateCvRequest {
                title: "Engineer".into(),
                skills: "Rust".into(),
                experience_text: "Engineer at Acme (2020): APIs".into(),
                phone: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(
            generated,
            GeneratedCv::Artifact(ArtifactHandle(format!("{base}/download_cv")))
        );
    }

    #[tokio::test]
    async fn test_generate_cv_inline_summary() {
        let base = serve(Router::new().route(
            "/generate_cv",
            post(|| async { Json(json!({"success": true, "summary": "Seasoned engineer."})) }),
        ))
        .await;

        let generated = client(&base)
            .generate_cv(&GenerateCvRequest {
                title: "Engineer".into(),
                skills: String::new(),
                experience_text: String::new(),
                phone: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(generated, GeneratedCv::Summary("Seasoned engineer.".into()));
    }

    #[tokio::test]
    async fn test_fetch_artifact_distinguishes_missing_from_failure() {
        let base = serve(
            Router::new()
                .route("/download_cv", get(|| async { Status::NOT_FOUND }))
                .route("/ready.pdf", get(|| async { "%PDF-1.4" }))
                .route("/broken.pdf", get(|| async { Status::INTERNAL_SERVER_ERROR })),
        )
        .await;
        let client = client(&base);

        assert_eq!(
            client.fetch_artifact(None).await.unwrap(),
            ArtifactFetch::NotGenerated
        );
        let ready = ArtifactHandle(format!("{base}/ready.pdf"));
        assert_eq!(
            client.fetch_artifact(Some(&ready)).await.unwrap(),
            ArtifactFetch::Ready(bytes::Bytes::from_static(b"%PDF-1.4"))
        );
        let broken = ArtifactHandle(format!("{base}/broken.pdf"));
        assert!(matches!(
            client.fetch_artifact(Some(&broken)).await,
            Err(GenerationError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let err = client("http://127.0.0.1:9")
            .regenerate_field(&summary_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }
}
