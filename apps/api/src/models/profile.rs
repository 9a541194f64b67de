use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProfileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub years: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub years: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
}

/// The canonical résumé document edited in one session.
///
/// Structured list items have no identity of their own: they are addressed by
/// position only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    pub full_name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Every addressable field of a [`ProfileDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    FullName,
    Title,
    Email,
    Phone,
    Location,
    Summary,
    Skills,
    Languages,
    Education,
    Experience,
    Projects,
}

/// Declared shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Text,
    TextList,
    EducationList,
    ExperienceList,
    ProjectList,
}

impl FieldShape {
    fn describe(self) -> &'static str {
        match self {
            FieldShape::Text => "a string",
            FieldShape::TextList => "a list of strings",
            FieldShape::EducationList => "a list of {school, degree, years}",
            FieldShape::ExperienceList => "a list of {title, company, years, description}",
            FieldShape::ProjectList => "a list of {name, description}",
        }
    }

    fn describe_item(self) -> &'static str {
        match self {
            FieldShape::EducationList => "an object {school, degree, years}",
            FieldShape::ExperienceList => "an object {title, company, years, description}",
            FieldShape::ProjectList => "an object {name, description}",
            FieldShape::Text | FieldShape::TextList => "a structured list item",
        }
    }
}

impl FieldKey {
    pub const ALL: [FieldKey; 11] = [
        FieldKey::FullName,
        FieldKey::Title,
        FieldKey::Email,
        FieldKey::Phone,
        FieldKey::Location,
        FieldKey::Summary,
        FieldKey::Skills,
        FieldKey::Languages,
        FieldKey::Education,
        FieldKey::Experience,
        FieldKey::Projects,
    ];

    pub fn shape(self) -> FieldShape {
        match self {
            FieldKey::FullName
            | FieldKey::Title
            | FieldKey::Email
            | FieldKey::Phone
            | FieldKey::Location
            | FieldKey::Summary => FieldShape::Text,
            FieldKey::Skills | FieldKey::Languages => FieldShape::TextList,
            FieldKey::Education => FieldShape::EducationList,
            FieldKey::Experience => FieldShape::ExperienceList,
            FieldKey::Projects => FieldShape::ProjectList,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::FullName => "fullName",
            FieldKey::Title => "title",
            FieldKey::Email => "email",
            FieldKey::Phone => "phone",
            FieldKey::Location => "location",
            FieldKey::Summary => "summary",
            FieldKey::Skills => "skills",
            FieldKey::Languages => "languages",
            FieldKey::Education => "education",
            FieldKey::Experience => "experience",
            FieldKey::Projects => "projects",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ProfileError::shape_mismatch(s, "a known profile field"))
    }
}

/// A whole-field value, already checked against one of the declared shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    TextList(Vec<String>),
    Education(Vec<Education>),
    Experience(Vec<Experience>),
    Projects(Vec<Project>),
}

impl FieldValue {
    /// Decodes a loosely-typed JSON value for `key`, rejecting anything whose
    /// shape differs from the field's declared shape.
    pub fn from_json(key: FieldKey, raw: Value) -> Result<Self, ProfileError> {
        let shape = key.shape();
        let mismatch = |_| ProfileError::shape_mismatch(key.as_str(), shape.describe());
        match shape {
            FieldShape::Text => match raw {
                Value::String(s) => Ok(FieldValue::Text(s)),
                _ => Err(ProfileError::shape_mismatch(key.as_str(), shape.describe())),
            },
            FieldShape::TextList => serde_json::from_value(raw)
                .map(FieldValue::TextList)
                .map_err(mismatch),
            FieldShape::EducationList => serde_json::from_value(raw)
                .map(FieldValue::Education)
                .map_err(mismatch),
            FieldShape::ExperienceList => serde_json::from_value(raw)
                .map(FieldValue::Experience)
                .map_err(mismatch),
            FieldShape::ProjectList => serde_json::from_value(raw)
                .map(FieldValue::Projects)
                .map_err(mismatch),
        }
    }

    /// Blank scalars and empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::TextList(v) => v.is_empty(),
            FieldValue::Education(v) => v.is_empty(),
            FieldValue::Experience(v) => v.is_empty(),
            FieldValue::Projects(v) => v.is_empty(),
        }
    }
}

/// One item of a structured list field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListItem {
    Education(Education),
    Experience(Experience),
    Project(Project),
}

impl ListItem {
    pub fn from_json(key: FieldKey, raw: Value) -> Result<Self, ProfileError> {
        let shape = key.shape();
        let mismatch = |_| ProfileError::shape_mismatch(key.as_str(), shape.describe_item());
        match shape {
            FieldShape::EducationList => serde_json::from_value(raw)
                .map(ListItem::Education)
                .map_err(mismatch),
            FieldShape::ExperienceList => serde_json::from_value(raw)
                .map(ListItem::Experience)
                .map_err(mismatch),
            FieldShape::ProjectList => serde_json::from_value(raw)
                .map(ListItem::Project)
                .map_err(mismatch),
            FieldShape::Text | FieldShape::TextList => Err(ProfileError::shape_mismatch(
                key.as_str(),
                "a field with indexable items",
            )),
        }
    }
}

pub fn item_label(key: FieldKey, index: usize) -> String {
    format!("{key}[{index}]")
}

impl ProfileDocument {
    /// Replaces one whole field. Fails with `ShapeMismatch` when the value's
    /// shape is not the field's declared shape.
    pub fn set_field(&mut self, key: FieldKey, value: FieldValue) -> Result<(), ProfileError> {
        match (key, value) {
            (FieldKey::FullName, FieldValue::Text(s)) => self.full_name = s,
            (FieldKey::Title, FieldValue::Text(s)) => self.title = s,
            (FieldKey::Email, FieldValue::Text(s)) => self.email = s,
            (FieldKey::Phone, FieldValue::Text(s)) => self.phone = s,
            (FieldKey::Location, FieldValue::Text(s)) => self.location = s,
            (FieldKey::Summary, FieldValue::Text(s)) => self.summary = s,
            (FieldKey::Skills, FieldValue::TextList(v)) => self.skills = v,
            (FieldKey::Languages, FieldValue::TextList(v)) => self.languages = v,
            (FieldKey::Education, FieldValue::Education(v)) => self.education = v,
            (FieldKey::Experience, FieldValue::Experience(v)) => self.experience = v,
            (FieldKey::Projects, FieldValue::Projects(v)) => self.projects = v,
            (key, _) => {
                return Err(ProfileError::shape_mismatch(
                    key.as_str(),
                    key.shape().describe(),
                ))
            }
        }
        Ok(())
    }

    /// Length of a list field, `None` for scalars.
    pub fn list_len(&self, key: FieldKey) -> Option<usize> {
        match key {
            FieldKey::Skills => Some(self.skills.len()),
            FieldKey::Languages => Some(self.languages.len()),
            FieldKey::Education => Some(self.education.len()),
            FieldKey::Experience => Some(self.experience.len()),
            FieldKey::Projects => Some(self.projects.len()),
            _ => None,
        }
    }

    /// Replaces the item at `index`. An index past the end is a `StaleTarget`;
    /// items are never appended through this path.
    pub fn set_item(
        &mut self,
        key: FieldKey,
        index: usize,
        item: ListItem,
    ) -> Result<(), ProfileError> {
        let stale = || ProfileError::StaleTarget {
            target: item_label(key, index),
        };
        match (key, item) {
            (FieldKey::Education, ListItem::Education(e)) => {
                *self.education.get_mut(index).ok_or_else(stale)? = e
            }
            (FieldKey::Experience, ListItem::Experience(e)) => {
                *self.experience.get_mut(index).ok_or_else(stale)? = e
            }
            (FieldKey::Projects, ListItem::Project(p)) => {
                *self.projects.get_mut(index).ok_or_else(stale)? = p
            }
            (key, _) => {
                return Err(ProfileError::shape_mismatch(
                    item_label(key, index),
                    key.shape().describe_item(),
                ))
            }
        }
        Ok(())
    }
}
