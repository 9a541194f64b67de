use serde::{Deserialize, Serialize};

use crate::models::profile::{Education, Experience, Project};

/// Profile object returned by the identity service. Never used as a document
/// directly; it goes through the source resolver first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportedProfile {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub picture: String,
    pub headline: Option<String>,
    pub skills: Option<Vec<String>>,
    pub education: Option<Vec<Education>>,
    pub experience: Option<Vec<Experience>>,
}

/// A partial profile from any external source. `None` means the source does
/// not supply the field at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceProfile {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub skills: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub education: Option<Vec<Education>>,
    pub experience: Option<Vec<Experience>>,
    pub projects: Option<Vec<Project>>,
}

impl SourceProfile {
    /// Identity providers expose name, email and sometimes a headline and
    /// career history. Phone, location and summary are never supplied.
    pub fn from_imported(profile: &ImportedProfile) -> Self {
        let full_name = if profile.name.trim().is_empty() {
            format!("{} {}", profile.first_name, profile.last_name)
                .trim()
                .to_string()
        } else {
            profile.name.trim().to_string()
        };

        SourceProfile {
            full_name: Some(full_name),
            title: profile.headline.clone(),
            email: Some(profile.email.clone()),
            skills: profile.skills.clone(),
            education: profile.education.clone(),
            experience: profile.experience.clone(),
            ..Default::default()
        }
    }
}
