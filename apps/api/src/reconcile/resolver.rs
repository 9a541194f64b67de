//! Source Resolver: folds an externally obtained profile into the document.
//!
//! Precedence, per field:
//! - scalars: a blank incoming value is treated as not supplied. Before the
//!   user has edited anything the incoming value wins; afterwards it only
//!   fills fields that are still blank.
//! - lists: replaced wholesale by a non-empty incoming list; an empty incoming
//!   list never displaces an existing one.
//! - fields the source does not supply are left untouched.

use serde::Serialize;
use tracing::{info, warn};

use crate::document::{sample_document, ChangeOrigin, DocumentStore, EditFlags};
use crate::errors::ProfileError;
use crate::models::patch::ProfilePatch;
use crate::models::profile::{FieldKey, FieldValue, ProfileDocument};
use crate::models::source::SourceProfile;

/// What a merge did, field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub revision: u64,
    /// Fields overwritten by the incoming source.
    pub applied: Vec<FieldKey>,
    /// Fields the source supplied but the current value was kept.
    pub preserved: Vec<FieldKey>,
}

/// Field-scoped patches to apply plus the fields kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub patches: Vec<ProfilePatch>,
    pub preserved: Vec<FieldKey>,
}

impl MergePlan {
    fn scalar(
        &mut self,
        key: FieldKey,
        current: &str,
        incoming: Option<&String>,
        flags: EditFlags,
    ) {
        let Some(incoming) = incoming.filter(|v| !v.trim().is_empty()) else {
            return;
        };
        if !flags.user_edited || current.trim().is_empty() {
            if current != incoming {
                self.patches.push(ProfilePatch::Field {
                    key,
                    value: FieldValue::Text(incoming.clone()),
                });
            }
        } else {
            self.preserved.push(key);
        }
    }

    fn list(&mut self, key: FieldKey, current_len: usize, incoming: Option<FieldValue>) {
        let Some(incoming) = incoming else {
            return;
        };
        if incoming.is_blank() {
            if current_len > 0 {
                self.preserved.push(key);
            }
            return;
        }
        self.patches.push(ProfilePatch::Field {
            key,
            value: incoming,
        });
    }
}

/// Computes the merge of `incoming` into `current` without touching any store.
pub fn plan_merge(
    current: &ProfileDocument,
    flags: EditFlags,
    incoming: &SourceProfile,
) -> MergePlan {
    let mut plan = MergePlan::default();

    plan.scalar(FieldKey::FullName, &current.full_name, incoming.full_name.as_ref(), flags);
    plan.scalar(FieldKey::Title, &current.title, incoming.title.as_ref(), flags);
    plan.scalar(FieldKey::Email, &current.email, incoming.email.as_ref(), flags);
    plan.scalar(FieldKey::Phone, &current.phone, incoming.phone.as_ref(), flags);
    plan.scalar(FieldKey::Location, &current.location, incoming.location.as_ref(), flags);
    plan.scalar(FieldKey::Summary, &current.summary, incoming.summary.as_ref(), flags);

    plan.list(
        FieldKey::Skills,
        current.skills.len(),
        incoming.skills.clone().map(FieldValue::TextList),
    );
    plan.list(
        FieldKey::Languages,
        current.languages.len(),
        incoming.languages.clone().map(FieldValue::TextList),
    );
    plan.list(
        FieldKey::Education,
        current.education.len(),
        incoming.education.clone().map(FieldValue::Education),
    );
    plan.list(
        FieldKey::Experience,
        current.experience.len(),
        incoming.experience.clone().map(FieldValue::Experience),
    );
    plan.list(
        FieldKey::Projects,
        current.projects.len(),
        incoming.projects.clone().map(FieldValue::Projects),
    );

    plan
}

/// Merges a source payload into the store in one atomic step.
///
/// An absent payload performs no merge and reports `SourceUnavailable`. In that
/// case the store falls back to the sample document, but only if no document
/// has been established yet this session.
pub fn merge_source(
    store: &DocumentStore,
    incoming: Option<&SourceProfile>,
) -> Result<MergeReport, ProfileError> {
    let Some(incoming) = incoming else {
        if !store.flags().established {
            let revision = store.replace_all(sample_document(), ChangeOrigin::Source);
            warn!("Profile source unavailable; falling back to sample document (revision {revision})");
        } else {
            warn!("Profile source unavailable; keeping current document");
        }
        return Err(ProfileError::SourceUnavailable);
    };

    let (revision, (applied, preserved)) = store.update(ChangeOrigin::Source, |doc, flags| {
        let plan = plan_merge(doc, flags, incoming);
        let mut applied = Vec::with_capacity(plan.patches.len());
        for patch in plan.patches {
            if let ProfilePatch::Field { key, .. } = &patch {
                applied.push(*key);
            }
            patch.apply_to(doc)?;
        }
        Ok((applied, plan.preserved))
    })?;

    info!(
        "Merged profile source at revision {revision}: {} applied, {} preserved",
        applied.len(),
        preserved.len()
    );

    Ok(MergeReport {
        revision,
        applied,
        preserved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Experience;

    fn edited() -> EditFlags {
        EditFlags {
            user_edited: true,
            established: true,
        }
    }

    #[test]
    fn test_empty_incoming_list_never_displaces_existing() {
        let store = DocumentStore::new();
        store.replace_all(
            ProfileDocument {
                skills: vec!["Go".into()],
                ..Default::default()
            },
            ChangeOrigin::Source,
        );

        let incoming = SourceProfile {
            skills: Some(vec![]),
            ..Default::default()
        };
        let report = merge_source(&store, Some(&incoming)).unwrap();

        assert_eq!(store.get().skills, vec!["Go".to_string()]);
        assert_eq!(report.preserved, vec![FieldKey::Skills]);
    }

    #[test]
    fn test_blank_title_is_filled_from_source() {
        let store = DocumentStore::new();
        let incoming = SourceProfile {
            title: Some("Engineer".into()),
            ..Default::default()
        };
        merge_source(&store, Some(&incoming)).unwrap();
        assert_eq!(store.get().title, "Engineer");
    }

    #[test]
    fn test_user_set_title_is_preserved() {
        let store = DocumentStore::new();
        store
            .replace_field(
                FieldKey::Title,
                FieldValue::Text("Architect".into()),
                ChangeOrigin::User,
            )
            .unwrap();

        let incoming = SourceProfile {
            title: Some("Engineer".into()),
            ..Default::default()
        };
        let report = merge_source(&store, Some(&incoming)).unwrap();

        assert_eq!(store.get().title, "Architect");
        assert_eq!(report.preserved, vec![FieldKey::Title]);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn test_unedited_document_takes_source_values() {
        let current = ProfileDocument {
            full_name: "Old Name".into(),
            ..Default::default()
        };
        let incoming = SourceProfile {
            full_name: Some("New Name".into()),
            ..Default::default()
        };
        let plan = plan_merge(&current, EditFlags::default(), &incoming);
        assert_eq!(plan.patches.len(), 1);
        assert!(plan.preserved.is_empty());
    }

    #[test]
    fn test_blank_incoming_scalar_is_not_supplied() {
        let current = ProfileDocument {
            email: "kept@example.com".into(),
            ..Default::default()
        };
        let incoming = SourceProfile {
            email: Some("  ".into()),
            ..Default::default()
        };
        let plan = plan_merge(&current, EditFlags::default(), &incoming);
        assert!(plan.patches.is_empty());
    }

    #[test]
    fn test_edited_document_fills_only_blank_scalars() {
        let current = ProfileDocument {
            full_name: "Typed By User".into(),
            email: String::new(),
            ..Default::default()
        };
        let incoming = SourceProfile {
            full_name: Some("From Source".into()),
            email: Some("src@example.com".into()),
            ..Default::default()
        };
        let plan = plan_merge(&current, edited(), &incoming);
        assert_eq!(
            plan.patches,
            vec![ProfilePatch::Field {
                key: FieldKey::Email,
                value: FieldValue::Text("src@example.com".into()),
            }]
        );
        assert_eq!(plan.preserved, vec![FieldKey::FullName]);
    }

    #[test]
    fn test_non_empty_list_replaces_wholesale() {
        let current = ProfileDocument {
            experience: vec![Experience {
                title: "Old".into(),
                company: "A".into(),
                years: "2019".into(),
                description: String::new(),
            }],
            ..Default::default()
        };
        let new_jobs = vec![
            Experience {
                title: "New".into(),
                company: "B".into(),
                years: "2021".into(),
                description: String::new(),
            },
            Experience {
                title: "Newer".into(),
                company: "C".into(),
                years: "2023".into(),
                description: String::new(),
            },
        ];
        let incoming = SourceProfile {
            experience: Some(new_jobs.clone()),
            ..Default::default()
        };
        let mut doc = current.clone();
        for patch in plan_merge(&current, edited(), &incoming).patches {
            patch.apply_to(&mut doc).unwrap();
        }
        assert_eq!(doc.experience, new_jobs);
    }

    #[test]
    fn test_unsupplied_fields_are_untouched() {
        let store = DocumentStore::new();
        store.replace_all(
            ProfileDocument {
                phone: "+44 20 7946 0000".into(),
                ..Default::default()
            },
            ChangeOrigin::Source,
        );
        let incoming = SourceProfile {
            full_name: Some("Ada".into()),
            ..Default::default()
        };
        merge_source(&store, Some(&incoming)).unwrap();
        let doc = store.get();
        assert_eq!(doc.phone, "+44 20 7946 0000");
        assert_eq!(doc.full_name, "Ada");
    }

    #[test]
    fn test_absent_source_falls_back_to_sample_once() {
        let store = DocumentStore::new();
        let err = merge_source(&store, None).unwrap_err();
        assert_eq!(err, ProfileError::SourceUnavailable);
        assert!(store.flags().established);
        assert_eq!(store.get(), sample_document());

        store
            .replace_field(
                FieldKey::Summary,
                FieldValue::Text("mine".into()),
                ChangeOrigin::User,
            )
            .unwrap();
        let revision = store.revision();
        assert!(merge_source(&store, None).is_err());
        assert_eq!(store.revision(), revision);
        assert_eq!(store.get().summary, "mine");
    }
}
