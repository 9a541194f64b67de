//! Document Store: holds the one canonical profile document of a session.
//!
//! State lives in a `watch` channel: every committed mutation bumps the
//! revision and is published to observers before the mutating call returns.
//! Mutations are transactional: a closure edits a scratch copy under the writer
//! lock, and the copy is only swapped in when the closure succeeds.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::document::sample::sample_document;
use crate::errors::ProfileError;
use crate::models::profile::{FieldKey, FieldValue, ListItem, ProfileDocument};

/// Who caused a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Initial,
    User,
    Source,
    Regeneration,
    Tailoring,
    Generation,
    Reset,
}

/// Session-level facts that precedence rules depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditFlags {
    /// The user has edited the document at least once since the last reset.
    pub user_edited: bool,
    /// A document has been established from a source (or the sample fallback).
    pub established: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreState {
    pub revision: u64,
    pub origin: ChangeOrigin,
    pub updated_at: DateTime<Utc>,
    pub flags: EditFlags,
    pub document: ProfileDocument,
}

pub struct DocumentStore {
    tx: watch::Sender<StoreState>,
    /// Serializes writers so read-edit-commit is atomic.
    writer: Mutex<()>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// A store holding the sample document, not yet established.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StoreState {
            revision: 0,
            origin: ChangeOrigin::Initial,
            updated_at: Utc::now(),
            flags: EditFlags::default(),
            document: sample_document(),
        });
        Self {
            tx,
            writer: Mutex::new(()),
        }
    }

    pub fn get(&self) -> ProfileDocument {
        self.tx.borrow().document.clone()
    }

    pub fn state(&self) -> StoreState {
        self.tx.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.tx.borrow().revision
    }

    pub fn flags(&self) -> EditFlags {
        self.tx.borrow().flags
    }

    /// Live-preview observers. The receiver always sees the latest revision.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }

    /// Runs `edit` against a copy of the current document and commits the copy
    /// only if `edit` succeeds. Returns the new revision with `edit`'s output.
    pub fn update<T>(
        &self,
        origin: ChangeOrigin,
        edit: impl FnOnce(&mut ProfileDocument, EditFlags) -> Result<T, ProfileError>,
    ) -> Result<(u64, T), ProfileError> {
        let _writer = self.writer.lock();
        let (mut draft, flags) = {
            let state = self.tx.borrow();
            (state.document.clone(), state.flags)
        };
        let value = edit(&mut draft, flags)?;

        let mut revision = 0;
        self.tx.send_modify(|state| {
            state.document = draft;
            state.revision += 1;
            state.origin = origin;
            state.updated_at = Utc::now();
            match origin {
                ChangeOrigin::User => {
                    state.flags.user_edited = true;
                    state.flags.established = true;
                }
                ChangeOrigin::Source | ChangeOrigin::Tailoring => {
                    state.flags.established = true;
                }
                _ => {}
            }
            revision = state.revision;
        });
        debug!("Document revision {revision} committed ({origin:?})");
        Ok((revision, value))
    }

    /// Replaces one whole field.
    pub fn replace_field(
        &self,
        key: FieldKey,
        value: FieldValue,
        origin: ChangeOrigin,
    ) -> Result<u64, ProfileError> {
        self.update(origin, |doc, _| doc.set_field(key, value))
            .map(|(revision, _)| revision)
    }

    /// Replaces one item of a structured list field.
    pub fn replace_item(
        &self,
        key: FieldKey,
        index: usize,
        item: ListItem,
        origin: ChangeOrigin,
    ) -> Result<u64, ProfileError> {
        self.update(origin, |doc, _| doc.set_item(key, index, item))
            .map(|(revision, _)| revision)
    }

    /// Atomic whole-document swap.
    pub fn replace_all(&self, document: ProfileDocument, origin: ChangeOrigin) -> u64 {
        let _writer = self.writer.lock();
        let mut revision = 0;
        self.tx.send_modify(|state| {
            state.document = document;
            state.revision += 1;
            state.origin = origin;
            state.updated_at = Utc::now();
            state.flags.established = true;
            revision = state.revision;
        });
        revision
    }

    /// Back to the sample document with a clean edit history (logout / clear).
    pub fn reset(&self) -> u64 {
        let _writer = self.writer.lock();
        let mut revision = 0;
        self.tx.send_modify(|state| {
            state.document = sample_document();
            state.revision += 1;
            state.origin = ChangeOrigin::Reset;
            state.updated_at = Utc::now();
            state.flags = EditFlags::default();
            revision = state.revision;
        });
        revision
    }
}
