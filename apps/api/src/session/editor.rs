//! One editing session: the document store, its pending markers, and the
//! operations that read and write them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{sample_document, ChangeOrigin, DocumentStore, StoreState};
use crate::errors::ProfileError;
use crate::export::ExportSnapshot;
use crate::generation::generator::{bounded, ArtifactFetch, ArtifactHandle, ProfileGenerator};
use crate::identity::{IdentityProvider, SessionCredential};
use crate::models::profile::{item_label, FieldKey, FieldValue, ListItem};
use crate::models::source::SourceProfile;
use crate::reconcile::{merge_source, MergeReport};
use crate::regeneration::pending::{PendingMarker, PendingRegistry, RequestRecord};
use crate::regeneration::{RegenerationCoordinator, RegenerationOutcome, RegenerationTarget};
use crate::tailoring::{GenerationOutcome, TailorOutcome, TailoringEngine};

/// Collaborators shared by every session, chosen at startup.
#[derive(Clone)]
pub struct SessionServices {
    pub generator: Arc<dyn ProfileGenerator>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub generation_timeout: Duration,
    pub identity_timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingView {
    pub markers: Vec<PendingMarker>,
    pub requests: Vec<RequestRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutReport {
    pub cleared_markers: usize,
    pub revision: u64,
}

pub struct EditorSession {
    pub id: Uuid,
    store: Arc<DocumentStore>,
    pending: Arc<PendingRegistry>,
    coordinator: RegenerationCoordinator,
    tailoring: TailoringEngine,
    services: SessionServices,
    credential: RwLock<Option<SessionCredential>>,
    artifact: Mutex<Option<ArtifactHandle>>,
}

impl EditorSession {
    pub fn new(services: SessionServices, credential: Option<SessionCredential>) -> Self {
        let store = Arc::new(DocumentStore::new());
        let pending = PendingRegistry::new();
        let coordinator = RegenerationCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&pending),
            Arc::clone(&services.generator),
            services.generation_timeout,
        );
        let tailoring = TailoringEngine::new(
            Arc::clone(&store),
            Arc::clone(&pending),
            Arc::clone(&services.generator),
            services.generation_timeout,
        );

        Self {
            id: Uuid::new_v4(),
            store,
            pending,
            coordinator,
            tailoring,
            services,
            credential: RwLock::new(credential),
            artifact: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[cfg(test)]
    pub fn pending_registry(&self) -> &Arc<PendingRegistry> {
        &self.pending
    }

    pub fn state(&self) -> StoreState {
        self.store.state()
    }

    /// Live preview: waits until the document moves past `after`, or until
    /// `limit` elapses, and returns the state current at that point.
    pub async fn wait_for_revision(&self, after: u64, limit: Duration) -> StoreState {
        let mut rx = self.store.subscribe();
        let changed = tokio::time::timeout(limit, rx.wait_for(|state| state.revision > after)).await;
        match changed {
            Ok(Ok(state)) => state.clone(),
            _ => self.store.state(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.read().is_some()
    }

    fn credential(&self) -> Option<SessionCredential> {
        self.credential.read().clone()
    }

    /// No document change for `max_idle` and nothing in flight.
    pub fn is_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> bool {
        if !self.pending.pending().is_empty() {
            return false;
        }
        let quiet = now.signed_duration_since(self.store.state().updated_at);
        quiet.to_std().is_ok_and(|quiet| quiet >= max_idle)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Sources
    // ────────────────────────────────────────────────────────────────────────

    /// Fetches the identity profile and merges it under the precedence rules.
    ///
    /// Without a credential or an identity service there is no source, which
    /// reports `SourceUnavailable` (and seeds the sample if nothing was loaded yet).
    pub async fn import(&self) -> Result<MergeReport, ProfileError> {
        let fetched = match (&self.services.identity, self.credential()) {
            (Some(identity), Some(credential)) => {
                let limit = self.services.identity_timeout;
                match tokio::time::timeout(limit, identity.fetch_profile(&credential)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("Profile import timed out after {}s", limit.as_secs());
                        return Err(ProfileError::Timeout {
                            operation: "profile import".to_string(),
                            seconds: limit.as_secs(),
                        });
                    }
                }
            }
            _ => None,
        };

        let source = fetched.as_ref().map(SourceProfile::from_imported);
        merge_source(&self.store, source.as_ref())
    }

    /// Explicit switch to the built-in sample document. Work still in flight
    /// against the previous document is discarded when it arrives.
    pub fn use_sample(&self) -> u64 {
        // Excludes `regenerate` from snapshotting the outgoing document.
        let (cleared, revision) = {
            let _slot = self.credential.write();
            let cleared = self.pending.clear();
            (cleared, self.store.replace_all(sample_document(), ChangeOrigin::Source))
        };
        info!(
            "Session {} switched to the sample document; cleared {cleared} pending marker(s)",
            self.id
        );
        revision
    }

    // ────────────────────────────────────────────────────────────────────────
    // User edits
    // ────────────────────────────────────────────────────────────────────────

    pub fn edit_field(&self, key: FieldKey, value: Value) -> Result<u64, ProfileError> {
        let value = FieldValue::from_json(key, value)?;
        debug!("Session {} edits {key}", self.id);
        self.store.replace_field(key, value, ChangeOrigin::User)
    }

    pub fn edit_item(&self, key: FieldKey, index: usize, value: Value) -> Result<u64, ProfileError> {
        let item = ListItem::from_json(key, value)?;
        debug!("Session {} edits {}", self.id, item_label(key, index));
        self.store.replace_item(key, index, item, ChangeOrigin::User)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Generator-backed operations
    // ────────────────────────────────────────────────────────────────────────

    pub async fn regenerate(
        &self,
        target: RegenerationTarget,
    ) -> Result<RegenerationOutcome, ProfileError> {
        let dispatch = {
            let credential = self.credential.read();
            self.coordinator.begin(credential.as_ref(), target)?
        };
        self.coordinator.finish(dispatch).await
    }

    pub fn pending(&self) -> PendingView {
        PendingView {
            markers: self.pending.pending(),
            requests: self.pending.records(),
        }
    }

    pub async fn tailor(&self, job_title: &str) -> Result<TailorOutcome, ProfileError> {
        let credential = self.credential();
        self.tailoring
            .tailor(credential.as_ref().map(SessionCredential::as_str), job_title)
            .await
    }

    pub async fn generate(&self) -> Result<GenerationOutcome, ProfileError> {
        let outcome = self.tailoring.generate().await?;
        if let GenerationOutcome::Artifact { handle } = &outcome {
            *self.artifact.lock() = Some(handle.clone());
        }
        Ok(outcome)
    }

    pub fn export(&self) -> ExportSnapshot {
        ExportSnapshot::capture(&self.store)
    }

    /// Downloads the last generated artifact (or the backend's default one).
    pub async fn fetch_artifact(&self) -> Result<ArtifactFetch, ProfileError> {
        let handle = self.artifact.lock().clone();
        bounded(
            "artifact download",
            self.services.generation_timeout,
            self.services.generator.fetch_artifact(handle.as_ref()),
        )
        .await
    }

    // ────────────────────────────────────────────────────────────────────────
    // Teardown
    // ────────────────────────────────────────────────────────────────────────

    /// Clears every pending marker, resets to the sample document and forgets
    /// the credential. Responses still in flight are discarded on arrival.
    /// The identity service is told best-effort; its failure never blocks logout.
    pub async fn logout(&self) -> LogoutReport {
        // Under the credential lock: a regeneration racing this call is either
        // refused or holds a marker that this clear makes stale.
        let (credential, cleared_markers) = {
            let mut slot = self.credential.write();
            (slot.take(), self.pending.clear())
        };
        let revision = self.store.reset();
        *self.artifact.lock() = None;

        if let (Some(identity), Some(credential)) = (&self.services.identity, credential) {
            let limit = self.services.identity_timeout;
            match tokio::time::timeout(limit, identity.logout(&credential)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Identity logout failed: {e}"),
                Err(_) => warn!("Identity logout timed out after {}s", limit.as_secs()),
            }
        }

        info!(
            "Session {} logged out; cleared {cleared_markers} pending marker(s)",
            self.id
        );
        LogoutReport {
            cleared_markers,
            revision,
        }
    }
}
