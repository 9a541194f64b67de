//! Export Snapshot Provider: read-only view handed to the renderer.
//!
//! Visibility is computed from the document at capture time, never cached.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::DocumentStore;
use crate::models::profile::ProfileDocument;

/// Body sections in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSection {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Languages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Phone,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactLine {
    pub kind: ContactKind,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSnapshot {
    pub revision: u64,
    pub captured_at: DateTime<Utc>,
    pub sections: Vec<ExportSection>,
    pub contact: Vec<ContactLine>,
    pub document: ProfileDocument,
}

impl ExportSnapshot {
    pub fn capture(store: &DocumentStore) -> Self {
        let state = store.state();
        Self {
            revision: state.revision,
            captured_at: Utc::now(),
            sections: visible_sections(&state.document),
            contact: contact_lines(&state.document),
            document: state.document,
        }
    }

    #[cfg(test)]
    pub fn includes(&self, section: ExportSection) -> bool {
        self.sections.contains(&section)
    }
}

/// Lists show when non-empty, the summary when non-blank.
pub fn visible_sections(doc: &ProfileDocument) -> Vec<ExportSection> {
    [
        (ExportSection::Summary, !doc.summary.trim().is_empty()),
        (ExportSection::Experience, !doc.experience.is_empty()),
        (ExportSection::Education, !doc.education.is_empty()),
        (ExportSection::Skills, !doc.skills.is_empty()),
        (ExportSection::Projects, !doc.projects.is_empty()),
        (ExportSection::Languages, !doc.languages.is_empty()),
    ]
    .into_iter()
    .filter_map(|(section, visible)| visible.then_some(section))
    .collect()
}

fn contact_lines(doc: &ProfileDocument) -> Vec<ContactLine> {
    [
        (ContactKind::Email, &doc.email),
        (ContactKind::Phone, &doc.phone),
        (ContactKind::Location, &doc.location),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .map(|(kind, value)| ContactLine {
        kind,
        value: value.trim().to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChangeOrigin;
    use crate::models::profile::{FieldKey, FieldValue};

    #[test]
    fn test_empty_projects_hidden_languages_shown() {
        let store = DocumentStore::new();
        store.replace_all(
            ProfileDocument {
                projects: vec![],
                languages: vec!["English".into()],
                ..Default::default()
            },
            ChangeOrigin::Source,
        );
        let snapshot = ExportSnapshot::capture(&store);
        assert!(!snapshot.includes(ExportSection::Projects));
        assert!(snapshot.includes(ExportSection::Languages));
    }

    #[test]
    fn test_blank_summary_is_hidden() {
        let doc = ProfileDocument {
            summary: "   ".into(),
            skills: vec!["Rust".into()],
            ..Default::default()
        };
        assert_eq!(visible_sections(&doc), vec![ExportSection::Skills]);
    }

    #[test]
    fn test_visibility_follows_latest_revision() {
        let store = DocumentStore::new();
        let before = ExportSnapshot::capture(&store);
        assert!(!before.includes(ExportSection::Summary));

        store
            .replace_field(
                FieldKey::Summary,
                FieldValue::Text("Builds things.".into()),
                ChangeOrigin::User,
            )
            .unwrap();
        let after = ExportSnapshot::capture(&store);
        assert!(after.includes(ExportSection::Summary));
        assert_eq!(after.revision, before.revision + 1);
    }

    #[test]
    fn test_contact_lines_skip_blank_values() {
        let doc = ProfileDocument {
            email: "ada@example.com".into(),
            location: " London ".into(),
            ..Default::default()
        };
        let lines = contact_lines(&doc);
        assert_eq!(
            lines,
            vec![
                ContactLine {
                    kind: ContactKind::Email,
                    value: "ada@example.com".into()
                },
                ContactLine {
                    kind: ContactKind::Location,
                    value: "London".into()
                },
            ]
        );
    }
}
