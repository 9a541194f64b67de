//! Generator port: the boundary to whatever produces AI-written profile content.
//!
//! Responses are loosely typed JSON on purpose: callers validate them against
//! the document's declared shapes before anything is applied.
//!
//! Every editing session shares one `Arc<dyn ProfileGenerator>`, chosen at startup via config.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::errors::{ProfileError, RemoteFailure};
use crate::models::profile::ProfileDocument;
use crate::regeneration::target::RegenerableField;

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

/// Document fields the generator may use as context besides the target slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub full_name: String,
    pub title: String,
    pub phone: String,
}

/// `{sessionId, fieldKey, index?}` plus the current value of the targeted slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRegenerationRequest {
    pub session_id: String,
    pub field_key: RegenerableField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub current: Value,
    pub context: GenerationContext,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    pub session_id: String,
    pub job_title: String,
    pub current_document: ProfileDocument,
}

/// Payload of the full-document generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCvRequest {
    pub title: String,
    pub skills: String,
    pub experience_text: String,
    pub phone: String,
}

impl GenerateCvRequest {
    pub fn from_document(doc: &ProfileDocument) -> Self {
        let experience_text = doc
            .experience
            .iter()
            .map(|exp| {
                format!(
                    "{} at {} ({}): {}",
                    exp.title, exp.company, exp.years, exp.description
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            title: doc.title.clone(),
            skills: doc.skills.join(", "),
            experience_text,
            phone: doc.phone.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Responses
// ────────────────────────────────────────────────────────────────────────────

/// Where a generated export artifact can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(pub String);

/// Full-document generation yields either summary text or a downloadable
/// artifact, depending on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedCv {
    Summary(String),
    Artifact(ArtifactHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactFetch {
    Ready(Bytes),
    NotGenerated,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited")]
    RateLimited,

    #[error("quota exhausted")]
    QuotaExhausted,

    #[error("remote error: {0}")]
    Remote(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.to_string())
    }
}

impl From<GenerationError> for ProfileError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Transport(msg) => ProfileError::NetworkFailure(msg),
            GenerationError::RateLimited => ProfileError::RemoteFailure(RemoteFailure::RateLimited),
            GenerationError::QuotaExhausted => {
                ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted)
            }
            GenerationError::Remote(msg) => ProfileError::RemoteFailure(RemoteFailure::Service(msg)),
            GenerationError::Malformed(msg) => ProfileError::RemoteFailure(RemoteFailure::Service(
                format!("malformed response: {msg}"),
            )),
        }
    }
}

/// Maps the HTTP status of a failed generator call to an error.
pub fn classify_status(status: u16, message: String) -> GenerationError {
    match status {
        429 => GenerationError::RateLimited,
        402 => GenerationError::QuotaExhausted,
        _ => GenerationError::Remote(format!("status {status}: {message}")),
    }
}

/// Awaits a generator call for at most `limit`. The remote work is not
/// cancelled; a late response is simply never looked at.
pub async fn bounded<T>(
    operation: &str,
    limit: Duration,
    call: impl Future<Output = Result<T, GenerationError>>,
) -> Result<T, ProfileError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|e| {
            warn!("{operation} failed: {e}");
            ProfileError::from(e)
        }),
        Err(_) => {
            warn!("{operation} timed out after {}s", limit.as_secs());
            Err(ProfileError::Timeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            })
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ProfileGenerator: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Rewrites one field or one indexed item. Returns the new value only.
    async fn regenerate_field(
        &self,
        request: &FieldRegenerationRequest,
    ) -> Result<Value, GenerationError>;

    /// Rewrites the whole document for a target job title.
    async fn tailor(&self, request: &TailorRequest) -> Result<Value, GenerationError>;

    async fn generate_cv(&self, request: &GenerateCvRequest)
        -> Result<GeneratedCv, GenerationError>;

    /// Backends that never produce artifacts report `NotGenerated`.
    async fn fetch_artifact(
        &self,
        _handle: Option<&ArtifactHandle>,
    ) -> Result<ArtifactFetch, GenerationError> {
        Ok(ArtifactFetch::NotGenerated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Experience;

    #[test]
    fn test_generate_cv_request_flattens_experience() {
        let doc = ProfileDocument {
            title: "Backend Engineer".into(),
            phone: "555-0100".into(),
            skills: vec!["Rust".into(), "Postgres".into()],
            experience: vec![
                Experience {
                    title: "Engineer".into(),
                    company: "Acme".into(),
                    years: "2020-2022".into(),
                    description: "Built APIs".into(),
                },
                Experience {
                    title: "Senior Engineer".into(),
                    company: "Initech".into(),
                    years: "2022-".into(),
                    description: "Led migrations".into(),
                },
            ],
            ..Default::default()
        };
        let req = GenerateCvRequest::from_document(&doc);
        assert_eq!(req.skills, "Rust, Postgres");
        assert_eq!(
            req.experience_text,
            "Engineer at Acme (2020-2022): Built APIs; Senior Engineer at Initech (2022-): Led migrations"
        );
        assert_eq!(req.phone, "555-0100");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(429, String::new()), GenerationError::RateLimited);
        assert_eq!(classify_status(402, String::new()), GenerationError::QuotaExhausted);
        assert!(matches!(
            classify_status(500, "boom".into()),
            GenerationError::Remote(_)
        ));
    }

    #[test]
    fn test_errors_map_to_taxonomy() {
        assert_eq!(
            ProfileError::from(GenerationError::Transport("reset".into())),
            ProfileError::NetworkFailure("reset".into())
        );
        assert_eq!(
            ProfileError::from(GenerationError::QuotaExhausted),
            ProfileError::RemoteFailure(RemoteFailure::QuotaExhausted)
        );
    }

    #[test]
    fn test_regeneration_request_wire_format() {
        let req = FieldRegenerationRequest {
            session_id: "abc".into(),
            field_key: RegenerableField::Summary,
            index: None,
            current: Value::String("old".into()),
            context: GenerationContext::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["fieldKey"], "summary");
        assert!(json.get("index").is_none());
    }
}
