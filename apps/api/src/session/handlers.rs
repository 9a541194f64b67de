use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::document::StoreState;
use crate::errors::{AppError, Remedy};
use crate::export::ExportSnapshot;
use crate::generation::generator::ArtifactFetch;
use crate::identity::SessionCredential;
use crate::models::profile::FieldKey;
use crate::reconcile::MergeReport;
use crate::regeneration::{RegenerationOutcome, RegenerationTarget};
use crate::session::editor::{LogoutReport, PendingView};
use crate::state::AppState;
use crate::tailoring::{GenerationOutcome, TailorOutcome};

#[derive(Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub sample: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    Identity,
    Sample,
}

/// A recovered failure the client should still tell the user about.
#[derive(Serialize)]
pub struct Notice {
    pub message: String,
    pub remedy: Remedy,
}

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub authenticated: bool,
    pub source: DocumentSource,
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub value: Value,
}

#[derive(Serialize)]
pub struct RevisionResponse {
    pub revision: u64,
}

#[derive(Deserialize)]
pub struct TailorRequestBody {
    pub job_title: String,
}

/// POST /api/v1/sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>), AppError> {
    let credential = match req.credential {
        Some(c) if c.trim().is_empty() => {
            return Err(AppError::Validation("credential must not be blank".into()))
        }
        Some(c) => Some(SessionCredential::new(c)),
        None => None,
    };
    let session = state.sessions.create(credential);

    let mut response = StartSessionResponse {
        session_id: session.id,
        authenticated: session.is_authenticated(),
        source: DocumentSource::Sample,
        revision: 0,
        merge: None,
        notice: None,
    };

    if req.sample || !session.is_authenticated() {
        response.revision = session.use_sample();
    } else {
        match session.import().await {
            Ok(report) => {
                response.source = DocumentSource::Identity;
                response.revision = report.revision;
                response.merge = Some(report);
            }
            Err(e) => {
                warn!("Session {} starts without its profile: {e}", session.id);
                response.revision = session.store().revision();
                response.notice = Some(Notice {
                    message: e.user_message(),
                    remedy: e.remedy(),
                });
            }
        }
    }

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/sessions/:id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreState>, AppError> {
    Ok(Json(state.sessions.get(id)?.state()))
}

/// Upper bound on one long-poll for document changes.
const WATCH_LIMIT: Duration = Duration::from_secs(25);

#[derive(Deserialize)]
pub struct WatchQuery {
    pub after: u64,
}

/// GET /api/v1/sessions/:id/document/changes?after=<revision>
pub async fn handle_watch_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<WatchQuery>,
) -> Result<Json<StoreState>, AppError> {
    let session = state.sessions.get(id)?;
    Ok(Json(session.wait_for_revision(query.after, WATCH_LIMIT).await))
}

/// PUT /api/v1/sessions/:id/fields/:key
pub async fn handle_edit_field(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<EditRequest>,
) -> Result<Json<RevisionResponse>, AppError> {
    let key: FieldKey = key.parse()?;
    let revision = state.sessions.get(id)?.edit_field(key, req.value)?;
    Ok(Json(RevisionResponse { revision }))
}

/// PUT /api/v1/sessions/:id/fields/:key/:index
pub async fn handle_edit_item(
    State(state): State<AppState>,
    Path((id, key, index)): Path<(Uuid, String, usize)>,
    Json(req): Json<EditRequest>,
) -> Result<Json<RevisionResponse>, AppError> {
    let key: FieldKey = key.parse()?;
    let revision = state.sessions.get(id)?.edit_item(key, index, req.value)?;
    Ok(Json(RevisionResponse { revision }))
}

/// POST /api/v1/sessions/:id/import
pub async fn handle_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MergeReport>, AppError> {
    let report = state.sessions.get(id)?.import().await?;
    Ok(Json(report))
}

/// POST /api/v1/sessions/:id/sample
pub async fn handle_use_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RevisionResponse>, AppError> {
    let revision = state.sessions.get(id)?.use_sample();
    Ok(Json(RevisionResponse { revision }))
}

/// POST /api/v1/sessions/:id/regenerate
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(target): Json<RegenerationTarget>,
) -> Result<Json<RegenerationOutcome>, AppError> {
    let outcome = state.sessions.get(id)?.regenerate(target).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/pending
pub async fn handle_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PendingView>, AppError> {
    Ok(Json(state.sessions.get(id)?.pending()))
}

/// POST /api/v1/sessions/:id/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TailorRequestBody>,
) -> Result<Json<TailorOutcome>, AppError> {
    let outcome = state.sessions.get(id)?.tailor(&req.job_title).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/sessions/:id/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationOutcome>, AppError> {
    let outcome = state.sessions.get(id)?.generate().await?;
    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportSnapshot>, AppError> {
    Ok(Json(state.sessions.get(id)?.export()))
}

/// GET /api/v1/sessions/:id/artifact
pub async fn handle_artifact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    match state.sessions.get(id)?.fetch_artifact().await? {
        ArtifactFetch::Ready(body) => {
            Ok(([(header::CONTENT_TYPE, "application/pdf")], body).into_response())
        }
        ArtifactFetch::NotGenerated => Err(AppError::NotFound(
            "No CV has been generated yet. Generate one first.".into(),
        )),
    }
}

/// POST /api/v1/sessions/:id/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LogoutReport>, AppError> {
    let report = state.sessions.remove(id)?.logout().await;
    Ok(Json(report))
}
