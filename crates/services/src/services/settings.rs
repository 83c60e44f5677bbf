//! Profile sync configuration.
//!
//! Settings are read once through a [`SettingsProvider`] into an immutable
//! [`ProfileSettings`] that is shared by every hook invocation.

use std::collections::HashMap;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;
use utils::api::hooks::SettingsField;

pub mod keys {
    pub const PROFILE_API_ENDPOINT: &str = "profile_api_endpoint";
    pub const PROFILE_API_REQUEST_HEADER: &str = "profile_api_request_header";
    pub const PROFILE_AVATAR_API_ENDPOINT: &str = "profile_avatar_api_endpoint";
    pub const CREATE_PROFILE_ENDPOINT: &str = "create_profile_endpoint";
    pub const AFFILIATION: &str = "affiliation";
    pub const AFFILIATION_ROLE: &str = "affiliation_wp_role";
    pub const DEFAULT_ROLE: &str = "default_role";
    pub const SITE_URL: &str = "site_url";
    pub const REDIRECT_ON_MISSING_PROFILE: &str = "redirect_on_missing_profile";
}

const DEFAULT_PROFILE_API_ENDPOINT: &str =
    "https://qa.profileapi.services.microsoft.com/profileapi/v1/Profile/id";
const DEFAULT_PROFILE_AVATAR_API_ENDPOINT: &str =
    "https://qa.profileapi.services.microsoft.com/profileapi/internal/v1/avatar";
const DEFAULT_CREATE_PROFILE_ENDPOINT: &str = "https://social.msdn.microsoft.com/Profile/u/create";
const DEFAULT_ROLE: &str = "subscriber";

const ENV_PREFIX: &str = "PROFILE_SYNC_";

/// Source of raw setting values. Returning `None` selects the default.
pub trait SettingsProvider {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsProvider for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads `PROFILE_SYNC_<KEY>` environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSettings;

impl SettingsProvider for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{ENV_PREFIX}{}", key.to_uppercase())).ok()
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting `{key}` is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("setting `{key}` must be a boolean, got `{value}`")]
    InvalidFlag { key: &'static str, value: String },
}

#[derive(Debug)]
pub struct ProfileSettings {
    pub profile_api_endpoint: Url,
    pub profile_api_request_header: SecretString,
    pub profile_avatar_api_endpoint: Url,
    pub create_profile_endpoint: Url,
    pub affiliation: Option<String>,
    pub affiliation_role: Option<String>,
    pub default_role: String,
    pub site_url: Option<Url>,
    pub redirect_on_missing_profile: bool,
}

impl ProfileSettings {
    pub fn load<P: SettingsProvider + ?Sized>(provider: &P) -> Result<Self, SettingsError> {
        let value = |key: &str| {
            provider
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let url = |key: &'static str, default: &str| {
            let raw = value(key).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|source| SettingsError::InvalidUrl { key, source })
        };

        let site_url = value(keys::SITE_URL)
            .map(|raw| {
                Url::parse(&raw).map_err(|source| SettingsError::InvalidUrl {
                    key: keys::SITE_URL,
                    source,
                })
            })
            .transpose()?;

        let redirect_on_missing_profile = match value(keys::REDIRECT_ON_MISSING_PROFILE) {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or(SettingsError::InvalidFlag {
                key: keys::REDIRECT_ON_MISSING_PROFILE,
                value: raw,
            })?,
        };

        Ok(Self {
            profile_api_endpoint: url(keys::PROFILE_API_ENDPOINT, DEFAULT_PROFILE_API_ENDPOINT)?,
            profile_api_request_header: SecretString::new(
                value(keys::PROFILE_API_REQUEST_HEADER)
                    .unwrap_or_default()
                    .into(),
            ),
            profile_avatar_api_endpoint: url(
                keys::PROFILE_AVATAR_API_ENDPOINT,
                DEFAULT_PROFILE_AVATAR_API_ENDPOINT,
            )?,
            create_profile_endpoint: url(
                keys::CREATE_PROFILE_ENDPOINT,
                DEFAULT_CREATE_PROFILE_ENDPOINT,
            )?,
            affiliation: value(keys::AFFILIATION),
            affiliation_role: value(keys::AFFILIATION_ROLE),
            default_role: value(keys::DEFAULT_ROLE).unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            site_url,
            redirect_on_missing_profile,
        })
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(&EnvSettings)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Fields the host's settings screen should offer.
pub fn settings_fields() -> Vec<SettingsField> {
    [
        (
            keys::PROFILE_API_REQUEST_HEADER,
            "Profile API Request Header token",
            None,
        ),
        (
            keys::AFFILIATION,
            "Affiliation to check",
            Some("Affiliation determines if user is allowed to create blogs."),
        ),
        (keys::PROFILE_API_ENDPOINT, "Profile API Endpoint", None),
        (
            keys::PROFILE_AVATAR_API_ENDPOINT,
            "Profile Avatar API Endpoint",
            None,
        ),
        (keys::CREATE_PROFILE_ENDPOINT, "Profile-Create URL", None),
    ]
    .into_iter()
    .map(|(id, label, description)| SettingsField {
        id: id.to_string(),
        label: label.to_string(),
        description: description.map(str::to_string),
    })
    .collect()
}
