use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ProfileError;
use crate::models::profile::FieldKey;

/// Fields the external generator can rewrite on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegenerableField {
    Summary,
    Skills,
    Experience,
}

impl RegenerableField {
    pub fn field_key(self) -> FieldKey {
        match self {
            RegenerableField::Summary => FieldKey::Summary,
            RegenerableField::Skills => FieldKey::Skills,
            RegenerableField::Experience => FieldKey::Experience,
        }
    }
}

/// `(fieldKey, index)`: the unit of exclusivity for regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegenerationTarget {
    pub field_key: RegenerableField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl RegenerationTarget {
    pub fn field(field_key: RegenerableField) -> Self {
        Self {
            field_key,
            index: None,
        }
    }

    pub fn item(field_key: RegenerableField, index: usize) -> Self {
        Self {
            field_key,
            index: Some(index),
        }
    }

    /// Only `experience` items are individually addressable.
    pub fn validate(&self) -> Result<(), ProfileError> {
        match (self.field_key, self.index) {
            (RegenerableField::Summary | RegenerableField::Skills, Some(_)) => {
                Err(ProfileError::shape_mismatch(
                    self.to_string(),
                    "a field without an item index",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RegenerationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.field_key.field_key()),
            None => write!(f, "{}", self.field_key.field_key()),
        }
    }
}
