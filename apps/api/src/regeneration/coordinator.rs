//! Field Regeneration Coordinator.
//!
//! Flow: check session → take pending marker → snapshot target slice →
//!       generator call (bounded by timeout) → field-scoped apply → release marker.
//!
//! The apply step edits only the targeted field or item of the document as it
//! is at completion time, so edits made while the request was in flight survive.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::document::{ChangeOrigin, DocumentStore};
use crate::errors::ProfileError;
use crate::generation::generator::{
    bounded, FieldRegenerationRequest, GenerationContext, ProfileGenerator,
};
use crate::identity::SessionCredential;
use crate::models::patch::ProfilePatch;
use crate::models::profile::{FieldKey, ListItem, ProfileDocument};
use crate::regeneration::pending::{Activity, PendingGuard, PendingRegistry, RequestStatus};
use crate::regeneration::target::{RegenerableField, RegenerationTarget};

#[derive(Debug, Clone, Serialize)]
pub struct RegenerationOutcome {
    pub target: RegenerationTarget,
    pub status: RequestStatus,
    pub revision: u64,
}

/// A regeneration that holds its marker and is ready to go out.
pub struct Dispatch {
    target: RegenerationTarget,
    guard: PendingGuard,
    request: FieldRegenerationRequest,
    baseline_len: Option<usize>,
}

pub struct RegenerationCoordinator {
    store: Arc<DocumentStore>,
    pending: Arc<PendingRegistry>,
    generator: Arc<dyn ProfileGenerator>,
    timeout: Duration,
}

impl RegenerationCoordinator {
    pub fn new(
        store: Arc<DocumentStore>,
        pending: Arc<PendingRegistry>,
        generator: Arc<dyn ProfileGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            pending,
            generator,
            timeout,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, target: RegenerationTarget) -> bool {
        self.pending.is_pending(&Activity::Regeneration { target })
    }

    /// Regenerates one field (or one `experience` item) through the generator.
    ///
    /// Fails fast with `Unauthorized` without a session credential and with
    /// `AlreadyInProgress` while the same target is pending. The pending marker
    /// is released on every exit path.
    #[cfg(test)]
    pub async fn regenerate(
        &self,
        credential: Option<&SessionCredential>,
        target: RegenerationTarget,
    ) -> Result<RegenerationOutcome, ProfileError> {
        let dispatch = self.begin(credential, target)?;
        self.finish(dispatch).await
    }

    /// Synchronous half of a regeneration: authorization, marker, snapshot.
    /// Callers that guard the credential hold that lock across this call so a
    /// concurrent logout either precedes it or clears the marker it takes.
    pub fn begin(
        &self,
        credential: Option<&SessionCredential>,
        target: RegenerationTarget,
    ) -> Result<Dispatch, ProfileError> {
        let Some(credential) = credential else {
            warn!("Regeneration of {target} refused: no session");
            return Err(ProfileError::Unauthorized);
        };
        target.validate()?;
        self.check_in_range(target)?;

        let guard = self.pending.try_acquire(Activity::Regeneration { target })?;

        let dispatched = self.store.get();
        let request = build_request(credential, target, &dispatched)?;
        let baseline_len = dispatched.list_len(target.field_key.field_key());

        Ok(Dispatch {
            target,
            guard,
            request,
            baseline_len,
        })
    }

    /// Calls the generator and applies its answer to the targeted slice.
    pub async fn finish(&self, dispatch: Dispatch) -> Result<RegenerationOutcome, ProfileError> {
        let Dispatch {
            target,
            guard,
            request,
            baseline_len,
        } = dispatch;

        info!(
            "Regenerating {target} via {} backend",
            self.generator.backend()
        );

        let raw = bounded(
            "regeneration",
            self.timeout,
            self.generator.regenerate_field(&request),
        )
        .await?;

        let (revision, ()) = self.store.update(ChangeOrigin::Regeneration, |doc, _| {
            if !guard.is_current() {
                return Err(ProfileError::StaleTarget {
                    target: target.to_string(),
                });
            }
            apply_regenerated(doc, target, baseline_len, raw)
        })?;
        guard.succeed();

        info!("Regenerated {target} at revision {revision}");
        Ok(RegenerationOutcome {
            target,
            status: RequestStatus::Succeeded,
            revision,
        })
    }

    /// An index past the end of the list is refused before any marker or
    /// request record exists for it.
    fn check_in_range(&self, target: RegenerationTarget) -> Result<(), ProfileError> {
        let Some(index) = target.index else {
            return Ok(());
        };
        let len = self
            .store
            .get()
            .list_len(target.field_key.field_key())
            .unwrap_or(0);
        if index >= len {
            return Err(ProfileError::StaleTarget {
                target: target.to_string(),
            });
        }
        Ok(())
    }
}

/// Captures the current value of the targeted slice plus the context fields.
fn build_request(
    credential: &SessionCredential,
    target: RegenerationTarget,
    doc: &ProfileDocument,
) -> Result<FieldRegenerationRequest, ProfileError> {
    let current = match (target.field_key, target.index) {
        (RegenerableField::Summary, _) => Value::String(doc.summary.clone()),
        (RegenerableField::Skills, _) => json!(doc.skills),
        (RegenerableField::Experience, None) => json!(doc.experience),
        (RegenerableField::Experience, Some(index)) => {
            let item = doc
                .experience
                .get(index)
                .ok_or_else(|| ProfileError::StaleTarget {
                    target: target.to_string(),
                })?;
            json!(item)
        }
    };

    Ok(FieldRegenerationRequest {
        session_id: credential.as_str().to_string(),
        field_key: target.field_key,
        index: target.index,
        current,
        context: GenerationContext {
            full_name: doc.full_name.clone(),
            title: doc.title.clone(),
            phone: doc.phone.clone(),
        },
    })
}

/// Applies a generator response to exactly the targeted slice of `doc`.
///
/// For an indexed item the list must still reach `index` and must not have
/// shrunk since dispatch; otherwise positional addressing could land on a
/// different item and the response is discarded as `StaleTarget`.
fn apply_regenerated(
    doc: &mut ProfileDocument,
    target: RegenerationTarget,
    baseline_len: Option<usize>,
    raw: Value,
) -> Result<(), ProfileError> {
    let key = target.field_key.field_key();
    let Some(index) = target.index else {
        return ProfilePatch::field(key, raw)?.apply_to(doc);
    };

    let len = doc.list_len(key).unwrap_or(0);
    if index >= len || baseline_len.is_some_and(|before| len < before) {
        warn!("Discarding regenerated {target}: list changed from {baseline_len:?} to {len} items");
        return Err(ProfileError::StaleTarget {
            target: target.to_string(),
        });
    }

    // A bare string rewrites only the item's description.
    let patch = match (key, raw) {
        (FieldKey::Experience, Value::String(description)) => {
            let mut item = doc.experience[index].clone();
            item.description = description;
            ProfilePatch::IndexedItem {
                key,
                index,
                item: ListItem::Experience(item),
            }
        }
        (key, raw) => ProfilePatch::indexed_item(key, index, raw)?,
    };
    patch.apply_to(doc)
}
