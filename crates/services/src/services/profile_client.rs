//! HTTP client for the remote profile and avatar service.

use std::time::Duration;

use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, HeaderName, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;
use url::Url;
use utils::api::profile::ProfileDocument;

const APPLICATION_KEY_HEADER: HeaderName = HeaderName::from_static("x-ms-applicationkey");

#[derive(Debug, Clone, Error)]
pub enum ProfileClientError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid application key header")]
    InvalidApplicationKey,
}

impl ProfileClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sends the application key and `Accept: application/json` on every call.
/// Anything but `200 OK` is an error; there are no retries.
#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: Client,
    application_key: HeaderValue,
}

impl ProfileClient {
    pub fn new(application_key: &SecretString) -> Result<Self, ProfileClientError> {
        // reqwest is built without a bundled crypto provider.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut application_key = HeaderValue::from_str(application_key.expose_secret())
            .map_err(|_| ProfileClientError::InvalidApplicationKey)?;
        application_key.set_sensitive(true);

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("profile-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProfileClientError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            application_key,
        })
    }

    /// Fetches and decodes a profile document.
    pub async fn fetch_profile(&self, url: &Url) -> Result<ProfileDocument, ProfileClientError> {
        let body = self.get_text(url).await?;
        ProfileDocument::parse(&body).map_err(|e| ProfileClientError::Serde(e.to_string()))
    }

    /// Fetches the avatar payload as the raw response body.
    pub async fn fetch_avatar(&self, url: &Url) -> Result<String, ProfileClientError> {
        self.get_text(url).await
    }

    async fn get_text(&self, url: &Url) -> Result<String, ProfileClientError> {
        debug!(%url, "requesting remote profile service");

        let res = self
            .http
            .get(url.clone())
            .header(APPLICATION_KEY_HEADER, self.application_key.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            StatusCode::OK => res.text().await.map_err(map_reqwest_error),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ProfileClientError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProfileClientError {
    if e.is_timeout() {
        ProfileClientError::Timeout
    } else {
        ProfileClientError::Transport(e.to_string())
    }
}
