//! Identity/session collaborator: who is logged in and what their imported
//! profile looks like.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{ProfileError, RemoteFailure};
use crate::models::source::ImportedProfile;

pub mod http;

pub use http::HttpIdentityClient;

/// Opaque session credential (cookie value or session id) issued by the
/// identity service. Never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(..)")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("identity service returned status {0}")]
    Status(u16),

    #[error("malformed profile: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Transport(e.to_string())
    }
}

impl From<IdentityError> for ProfileError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Transport(msg) => ProfileError::NetworkFailure(msg),
            IdentityError::Status(status) => ProfileError::RemoteFailure(RemoteFailure::Service(
                format!("identity service returned status {status}"),
            )),
            IdentityError::Malformed(msg) => {
                ProfileError::RemoteFailure(RemoteFailure::Service(msg))
            }
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the credential is not (or no longer) logged in.
    async fn fetch_profile(
        &self,
        credential: &SessionCredential,
    ) -> Result<Option<ImportedProfile>, IdentityError>;

    /// Ends the server-side session.
    async fn logout(&self, credential: &SessionCredential) -> Result<(), IdentityError>;
}
