use serde_json::Value;

use crate::errors::ProfileError;
use crate::models::profile::{FieldKey, FieldValue, ListItem, ProfileDocument};

/// A proposed change to a [`ProfileDocument`].
///
/// Values are decoded against the declared field shapes when the patch is
/// built, so arbitrary generator output is rejected with `ShapeMismatch`
/// before it can reach the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePatch {
    Field { key: FieldKey, value: FieldValue },
    IndexedItem {
        key: FieldKey,
        index: usize,
        item: ListItem,
    },
    FullDocument(Box<ProfileDocument>),
}

impl ProfilePatch {
    pub fn field(key: FieldKey, raw: Value) -> Result<Self, ProfileError> {
        Ok(ProfilePatch::Field {
            key,
            value: FieldValue::from_json(key, raw)?,
        })
    }

    pub fn indexed_item(key: FieldKey, index: usize, raw: Value) -> Result<Self, ProfileError> {
        Ok(ProfilePatch::IndexedItem {
            key,
            index,
            item: ListItem::from_json(key, raw)?,
        })
    }

    pub fn full_document(raw: Value) -> Result<Self, ProfileError> {
        serde_json::from_value::<ProfileDocument>(raw)
            .map(|doc| ProfilePatch::FullDocument(Box::new(doc)))
            .map_err(|e| ProfileError::shape_mismatch("document", format!("a complete profile ({e})")))
    }

    /// Applies the patch in place. Only the addressed field or item changes.
    pub fn apply_to(self, doc: &mut ProfileDocument) -> Result<(), ProfileError> {
        match self {
            ProfilePatch::Field { key, value } => doc.set_field(key, value),
            ProfilePatch::IndexedItem { key, index, item } => doc.set_item(key, index, item),
            ProfilePatch::FullDocument(replacement) => {
                *doc = *replacement;
                Ok(())
            }
        }
    }
}
