//! Whole-document rewrites: tailoring to a job title, and full CV generation.
//!
//! Tailoring is the one operation allowed to replace the document wholesale.
//! It holds the `Tailoring` pending marker for its whole run, so it never
//! overlaps a field regeneration.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::document::{ChangeOrigin, DocumentStore};
use crate::errors::ProfileError;
use crate::generation::generator::{
    bounded, ArtifactHandle, GenerateCvRequest, GeneratedCv, ProfileGenerator, TailorRequest,
};
use crate::models::patch::ProfilePatch;
use crate::models::profile::{FieldKey, FieldValue};
use crate::regeneration::pending::{Activity, PendingRegistry};
use crate::regeneration::target::{RegenerableField, RegenerationTarget};

/// Session id sent when nobody is logged in.
pub const ANONYMOUS_SESSION: &str = "sample";

#[derive(Debug, Clone, Serialize)]
pub struct TailorOutcome {
    pub job_title: String,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// Summary text was written into the document.
    Summary { revision: u64 },
    /// The backend rendered a downloadable artifact.
    Artifact { handle: ArtifactHandle },
}

pub struct TailoringEngine {
    store: Arc<DocumentStore>,
    pending: Arc<PendingRegistry>,
    generator: Arc<dyn ProfileGenerator>,
    timeout: Duration,
}

impl TailoringEngine {
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

    /// Rewrites the whole document for `job_title` and swaps it in atomically.
    pub async fn tailor(
        &self,
        session_id: Option<&str>,
        job_title: &str,
    ) -> Result<TailorOutcome, ProfileError> {
        let job_title = job_title.trim();
        if job_title.is_empty() {
            return Err(ProfileError::MissingInput("a job title".to_string()));
        }

        let guard = self.pending.try_acquire(Activity::Tailoring)?;
        let request = TailorRequest {
            session_id: session_id.unwrap_or(ANONYMOUS_SESSION).to_string(),
            job_title: job_title.to_string(),
            current_document: self.store.get(),
        };
        info!(
            "Tailoring document for \"{job_title}\" via {} backend",
            self.generator.backend()
        );

        let raw = bounded("tailoring", self.timeout, self.generator.tailor(&request)).await?;
        let patch = ProfilePatch::full_document(raw)?;

        let (revision, ()) = self.store.update(ChangeOrigin::Tailoring, |doc, _| {
            if !guard.is_current() {
                return Err(ProfileError::StaleTarget {
                    target: "document".to_string(),
                });
            }
            patch.apply_to(doc)
        })?;
        guard.succeed();

        info!("Tailored document for \"{job_title}\" at revision {revision}");
        Ok(TailorOutcome {
            job_title: job_title.to_string(),
            revision,
        })
    }

    /// Full-document generation. A summary result only touches `summary`;
    /// an artifact result leaves the document alone.
    ///
    /// Holds the `summary` marker, so it is refused while the summary is
    /// regenerating or the document is being tailored.
    pub async fn generate(&self) -> Result<GenerationOutcome, ProfileError> {
        let target = RegenerationTarget::field(RegenerableField::Summary);
        let guard = self
            .pending
            .try_acquire(Activity::Regeneration { target })?;

        let request = GenerateCvRequest::from_document(&self.store.get());
        info!(
            "Generating CV for \"{}\" via {} backend",
            request.title,
            self.generator.backend()
        );

        let generated = bounded(
            "CV generation",
            self.timeout,
            self.generator.generate_cv(&request),
        )
        .await?;

        let outcome = match generated {
            GeneratedCv::Summary(summary) => {
                let (revision, ()) = self.store.update(ChangeOrigin::Generation, |doc, _| {
                    if !guard.is_current() {
                        return Err(ProfileError::StaleTarget {
                            target: target.to_string(),
                        });
                    }
                    doc.set_field(FieldKey::Summary, FieldValue::Text(summary))
                })?;
                GenerationOutcome::Summary { revision }
            }
            GeneratedCv::Artifact(handle) => GenerationOutcome::Artifact { handle },
        };
        guard.succeed();
        Ok(outcome)
    }
}
