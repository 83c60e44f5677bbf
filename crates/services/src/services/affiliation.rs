use tracing::debug;
use utils::api::{hooks::RegistrationMode, profile::ProfileDocument};

use super::{
    settings::ProfileSettings,
    user_store::{UserStore, UserStoreError, attributes},
};

pub fn is_affiliated(profile: &ProfileDocument, affiliation: &str) -> bool {
    profile
        .affiliations
        .present()
        .is_some_and(|affiliations| affiliations.includes(affiliation))
}

/// The profile stored on a user during the last sync, if it still parses.
pub async fn stored_profile<S>(
    store: &S,
    user_id: i64,
) -> Result<Option<ProfileDocument>, UserStoreError>
where
    S: UserStore + ?Sized,
{
    let Some(raw) = store
        .get_attribute(user_id, attributes::USER_PROFILE_DATA)
        .await?
    else {
        return Ok(None);
    };

    match ProfileDocument::parse(&raw) {
        Ok(profile) => Ok(Some(profile)),
        Err(error) => {
            debug!(user_id, %error, "stored profile data is not valid json");
            Ok(None)
        }
    }
}

pub async fn user_is_affiliated<S>(
    store: &S,
    user_id: i64,
    affiliation: &str,
) -> Result<bool, UserStoreError>
where
    S: UserStore + ?Sized,
{
    Ok(stored_profile(store, user_id)
        .await?
        .is_some_and(|profile| is_affiliated(&profile, affiliation)))
}

/// Whoever is asking for the registration decision.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: i64,
    pub super_admin: bool,
}

/// Super administrators may always register sites; everyone else needs a
/// synced profile carrying the configured affiliation.
pub async fn registration_mode<S>(
    store: &S,
    settings: &ProfileSettings,
    viewer: Viewer,
) -> Result<RegistrationMode, UserStoreError>
where
    S: UserStore + ?Sized,
{
    if viewer.super_admin {
        return Ok(RegistrationMode::Blog);
    }

    let Some(affiliation) = settings.affiliation.as_deref() else {
        return Ok(RegistrationMode::None);
    };

    if user_is_affiliated(store, viewer.user_id, affiliation).await? {
        Ok(RegistrationMode::Blog)
    } else {
        Ok(RegistrationMode::None)
    }
}
