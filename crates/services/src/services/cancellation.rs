//! Abandoned profile creation.
//!
//! The profile-creation page sends users who cancel back to our logout URL
//! with a `profile-cancel` marker. The remote service escapes the query string
//! twice on the way back, so every parameter may also arrive prefixed with
//! `amp;amp;`.

use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use super::user_store::UserStoreError;

pub const CANCEL_MARKER: &str = "profile-cancel";
pub const REDIRECT_PARAM: &str = "redirect_to";
pub const ACTION_PARAM: &str = "action";
pub const LOGOUT_ACTION: &str = "logout";
const ESCAPED_PREFIX: &str = "amp;amp;";

/// Ends the session of whoever sent the current request.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    async fn logout(&self) -> Result<(), UserStoreError>;
}

/// Whether the request asks for a logout, in plain or escaped form.
pub fn is_logout(params: &HashMap<String, String>) -> bool {
    [ACTION_PARAM.to_string(), escaped(ACTION_PARAM)]
        .iter()
        .any(|key| params.get(key).is_some_and(|action| action == LOGOUT_ACTION))
}

pub fn is_cancellation(params: &HashMap<String, String>) -> bool {
    params.contains_key(CANCEL_MARKER) || params.contains_key(&escaped(CANCEL_MARKER))
}

/// Where a cancelled user should land, or `None` when the request is an
/// ordinary logout.
pub fn cancellation_target(
    params: &HashMap<String, String>,
    site_url: Option<&Url>,
) -> Option<String> {
    if !is_cancellation(params) {
        return None;
    }

    let requested = params
        .get(&escaped(REDIRECT_PARAM))
        .filter(|value| !value.is_empty())
        .or_else(|| params.get(REDIRECT_PARAM))
        .map(String::as_str)
        .unwrap_or_default();

    Some(safe_redirect(requested, site_url))
}

/// Accepts absolute paths and http(s) URLs; with a configured site, absolute
/// URLs must stay on the site's host.
pub fn safe_redirect(target: &str, site_url: Option<&Url>) -> String {
    let fallback = || site_url.map_or_else(|| "/".to_string(), |site| site.to_string());
    let target = target.trim();

    if target.starts_with('/') && !target.starts_with("//") && !target.contains('\\') {
        return target.to_string();
    }

    let Ok(url) = Url::parse(target) else {
        return fallback();
    };

    if !matches!(url.scheme(), "http" | "https") {
        return fallback();
    }

    match site_url {
        Some(site) if site.host_str() != url.host_str() => fallback(),
        _ => url.to_string(),
    }
}

fn escaped(key: &str) -> String {
    format!("{ESCAPED_PREFIX}{key}")
}
