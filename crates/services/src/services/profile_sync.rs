//! Profile synchronization hooks.
//!
//! Every sign-in pulls the user's document from the remote profile service,
//! stores it on the local account together with the nickname and avatar, and
//! sends users who have no remote profile yet to the profile-creation page.

use std::{collections::HashMap, fmt, sync::Arc};

use db::models::user::{UpdateUser, User};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;
use utils::api::{hooks::RegistrationMode, profile::ProfileDocument};

use super::{
    affiliation::{self, Viewer},
    cancellation::{self, CANCEL_MARKER, REDIRECT_PARAM, SessionTerminator},
    identity::{self, extract_puid},
    merge,
    profile_client::{ProfileClient, ProfileClientError},
    settings::ProfileSettings,
    user_store::{UserStore, UserStoreError, attributes},
};

const AVATAR_SIZE: &str = "extralarge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEndpoint {
    Profile,
    Avatar,
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => f.write_str("profile"),
            Self::Avatar => f.write_str("avatar"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProfileSyncError {
    #[error("bad response from {endpoint} endpoint: {status}")]
    BadRemoteResponse { endpoint: RemoteEndpoint, status: u16 },
    #[error("profile is missing DisplayName or AvatarVersion")]
    MissingProfileFields,
    #[error("{endpoint} request failed: {source}")]
    Remote {
        endpoint: RemoteEndpoint,
        #[source]
        source: ProfileClientError,
    },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Store(#[from] UserStoreError),
}

impl ProfileSyncError {
    fn remote(endpoint: RemoteEndpoint, error: ProfileClientError) -> Self {
        match error.status() {
            Some(status) => Self::BadRemoteResponse { endpoint, status },
            None => Self::Remote {
                endpoint,
                source: error,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// URL of the request being handled. When set, a missing profile turns
    /// into a redirect to profile creation that returns here afterwards.
    pub redirect_from: Option<Url>,
    /// Newly created accounts may be promoted to the affiliation role.
    pub new_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    ProfileRequired { redirect_to: Url },
}

/// What the caller should do with the request after a hook ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    Redirect(Url),
}

pub struct ProfileSync<S> {
    settings: Arc<ProfileSettings>,
    client: ProfileClient,
    store: S,
}

impl<S: UserStore> ProfileSync<S> {
    pub fn new(settings: Arc<ProfileSettings>, store: S) -> Result<Self, ProfileClientError> {
        let client = ProfileClient::new(&settings.profile_api_request_header)?;
        Ok(Self {
            settings,
            client,
            store,
        })
    }

    pub fn settings(&self) -> &ProfileSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(name = "profile_sync.on_user_found", skip(self, claim, return_to))]
    pub async fn on_user_found(
        &self,
        user_id: i64,
        claim: &str,
        return_to: Option<&Url>,
    ) -> Result<HookOutcome, UserStoreError> {
        self.save_profile_data(user_id, claim, false, return_to)
            .await
    }

    #[instrument(name = "profile_sync.on_new_user", skip(self, claim, return_to))]
    pub async fn on_new_user(
        &self,
        user_id: i64,
        claim: &str,
        return_to: Option<&Url>,
    ) -> Result<HookOutcome, UserStoreError> {
        self.save_profile_data(user_id, claim, true, return_to)
            .await
    }

    #[instrument(name = "profile_sync.on_resolve_identity", skip_all)]
    pub async fn on_resolve_identity(&self, claim: &str) -> Result<Option<User>, UserStoreError> {
        identity::resolve_identity(&self.store, claim).await
    }

    /// Returns the redirect target when the logout cancels profile creation,
    /// after ending the session. Ordinary logouts are left alone.
    #[instrument(name = "profile_sync.on_logout_request", skip_all)]
    pub async fn on_logout_request<T>(
        &self,
        params: &HashMap<String, String>,
        session: &T,
    ) -> Result<Option<String>, UserStoreError>
    where
        T: SessionTerminator + ?Sized,
    {
        let Some(target) = cancellation::cancellation_target(params, self.settings.site_url.as_ref())
        else {
            return Ok(None);
        };

        session.logout().await?;
        info!(%target, "profile creation cancelled; session ended");
        Ok(Some(target))
    }

    #[instrument(name = "profile_sync.on_link_accounts", skip(self))]
    pub async fn on_link_accounts(
        &self,
        user_to_link: i64,
        user_to_keep: i64,
    ) -> Result<Vec<&'static str>, UserStoreError> {
        merge::link_accounts(&self.store, user_to_link, user_to_keep).await
    }

    pub async fn registration_mode(&self, viewer: Viewer) -> Result<RegistrationMode, UserStoreError> {
        affiliation::registration_mode(&self.store, &self.settings, viewer).await
    }

    /// Stores the PUID from the claim and syncs the profile. Sync failures are
    /// logged and swallowed; only a missing profile changes the outcome.
    async fn save_profile_data(
        &self,
        user_id: i64,
        claim: &str,
        new_user: bool,
        return_to: Option<&Url>,
    ) -> Result<HookOutcome, UserStoreError> {
        let puid = extract_puid(claim);
        if puid.is_empty() {
            debug!(user_id, "claim carries no puid; skipping profile sync");
            return Ok(HookOutcome::Continue);
        }

        if let Some(owner) = self
            .store
            .find_by_attribute(attributes::USER_PUID, puid)
            .await?
            && owner.id != user_id
        {
            warn!(
                user_id,
                owner_id = owner.id,
                puid,
                "puid already bound to another user; skipping profile sync"
            );
            return Ok(HookOutcome::Continue);
        }

        self.store
            .set_attribute(user_id, attributes::USER_PUID, puid)
            .await?;

        let options = SyncOptions {
            redirect_from: return_to.cloned().or_else(|| self.settings.site_url.clone()),
            new_user,
        };

        match self.sync(user_id, puid, options).await {
            Ok(SyncOutcome::Synced) => Ok(HookOutcome::Continue),
            Ok(SyncOutcome::ProfileRequired { redirect_to }) => Ok(HookOutcome::Redirect(redirect_to)),
            Err(error) => {
                warn!(user_id, puid, %error, "profile sync failed");
                Ok(HookOutcome::Continue)
            }
        }
    }

    /// Pulls the remote profile for `puid` onto `user_id`.
    ///
    /// Writes are not rolled back: when the avatar step fails, the profile
    /// data, profile id and nickname from the first call stay in place.
    ///
    /// Only an HTTP status from the profile endpoint can turn into a redirect.
    /// Timeouts and connection failures never redirect, even with a redirect
    /// source; they come back as [`ProfileSyncError::Remote`].
    #[instrument(name = "profile_sync.sync", skip(self, options), fields(new_user = options.new_user))]
    pub async fn sync(
        &self,
        user_id: i64,
        puid: &str,
        options: SyncOptions,
    ) -> Result<SyncOutcome, ProfileSyncError> {
        let profile_url = profile_url(&self.settings.profile_api_endpoint, puid)?;

        let profile = match self.client.fetch_profile(&profile_url).await {
            Ok(profile) => profile,
            Err(ProfileClientError::Http { status, .. }) => {
                let redirect_from = options
                    .redirect_from
                    .as_ref()
                    .filter(|_| self.settings.redirect_on_missing_profile);

                return match redirect_from {
                    Some(current) => {
                        let redirect_to = self.profile_creation_url(current)?;
                        info!(status, "no remote profile; redirecting to profile creation");
                        Ok(SyncOutcome::ProfileRequired { redirect_to })
                    }
                    None => Err(ProfileSyncError::BadRemoteResponse {
                        endpoint: RemoteEndpoint::Profile,
                        status,
                    }),
                };
            }
            Err(error) => return Err(ProfileSyncError::remote(RemoteEndpoint::Profile, error)),
        };

        self.store
            .set_attribute(
                user_id,
                attributes::USER_PROFILE_DATA,
                &profile.raw().to_string(),
            )
            .await?;

        if let Some(profile_id) = profile.user_id.present() {
            self.store
                .set_attribute(user_id, attributes::USER_PROFILE_ID, profile_id)
                .await?;
        }

        let mut update = UpdateUser::default();
        if let Some(display_name) = profile.display_name.present() {
            self.store
                .set_attribute(user_id, attributes::NICKNAME, display_name)
                .await?;
            update.display_name = Some(display_name.clone());
        }
        if options.new_user {
            update.role = self.affiliation_role_for(&profile);
        }
        if !update.is_empty() {
            self.store.update_user(user_id, &update).await?;
        }

        let (Some(display_name), Some(avatar_version)) = (
            profile.display_name.present(),
            profile.avatar_version.present(),
        ) else {
            return Err(ProfileSyncError::MissingProfileFields);
        };

        let avatar_url = avatar_url(
            &self.settings.profile_avatar_api_endpoint,
            display_name,
            avatar_version,
        )?;
        let body = self
            .client
            .fetch_avatar(&avatar_url)
            .await
            .map_err(|error| ProfileSyncError::remote(RemoteEndpoint::Avatar, error))?;

        self.store
            .set_attribute(
                user_id,
                attributes::USER_PROFILE_AVATAR_BASE64,
                strip_quotes(&body),
            )
            .await?;

        info!(user_id, "profile synchronized");
        Ok(SyncOutcome::Synced)
    }

    fn affiliation_role_for(&self, profile: &ProfileDocument) -> Option<String> {
        let role = self.settings.affiliation_role.as_ref()?;
        let affiliation = self.settings.affiliation.as_deref()?;
        affiliation::is_affiliated(profile, affiliation).then(|| role.clone())
    }

    /// Profile-creation URL carrying where to come back to (`referrer`) and
    /// where to go on cancel (`cancelUrl`).
    fn profile_creation_url(&self, current: &Url) -> Result<Url, url::ParseError> {
        let referrer = without_query_param(current, "code");
        let site = self
            .settings
            .site_url
            .clone()
            .unwrap_or_else(|| site_root(current));

        let mut cancel = with_trailing_slash(&site).join("login")?;
        cancel
            .query_pairs_mut()
            .append_pair("action", "logout")
            .append_pair(REDIRECT_PARAM, site.as_str())
            .append_pair(CANCEL_MARKER, "1");

        let mut url = self.settings.create_profile_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("referrer", referrer.as_str())
            .append_pair("cancelUrl", cancel.as_str());
        Ok(url)
    }
}

/// `<endpoint>/puid:<puid>`. The PUID is appended as text because `puid:`
/// would read as a URL scheme if it were joined.
pub fn profile_url(endpoint: &Url, puid: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/puid:{}",
        endpoint.as_str().trim_end_matches('/'),
        puid
    ))
}

pub fn avatar_url(endpoint: &Url, display_name: &str, version: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}?displayname={}&size={AVATAR_SIZE}&version={}",
        endpoint.as_str(),
        urlencoding::encode(display_name),
        urlencoding::encode(version),
    ))
}

/// The avatar service wraps its base64 payload in one pair of quotes.
fn strip_quotes(body: &str) -> &str {
    let body = body.trim();
    let body = body.strip_prefix('"').unwrap_or(body);
    body.strip_suffix('"').unwrap_or(body)
}

fn without_query_param(url: &Url, name: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = url.clone();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}

fn site_root(url: &Url) -> Url {
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
