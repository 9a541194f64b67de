use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use crate::identity::{IdentityError, IdentityProvider, SessionCredential};
use crate::models::source::ImportedProfile;

/// Name of the cookie the identity service issues after OAuth login.
const SESSION_COOKIE: &str = "session";

/// `IdentityProvider` over the identity service's HTTP API:
/// `GET /api/profile` and `POST /logout`, authenticated by session cookie.
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn cookie(credential: &SessionCredential) -> String {
        format!("{SESSION_COOKIE}={}", credential.as_str())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityClient {
    async fn fetch_profile(
        &self,
        credential: &SessionCredential,
    ) -> Result<Option<ImportedProfile>, IdentityError> {
        let response = self
            .client
            .get(format!("{}/api/profile", self.base_url))
            .header(header::COOKIE, Self::cookie(credential))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("Identity service has no profile for this session");
                Ok(None)
            }
            status if status.is_success() => {
                let body = response.bytes().await?;
                serde_json::from_slice::<Option<ImportedProfile>>(&body)
                    .map_err(|e| IdentityError::Malformed(e.to_string()))
            }
            status => {
                warn!("Identity service returned {status}");
                Err(IdentityError::Status(status.as_u16()))
            }
        }
    }

    async fn logout(&self, credential: &SessionCredential) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(format!("{}/logout", self.base_url))
            .header(header::COOKIE, Self::cookie(credential))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(IdentityError::Status(response.status().as_u16()))
        }
    }
}
