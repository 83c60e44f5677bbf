use db::models::user::UpdateUser;
use tracing::{debug, info};
use utils::api::profile::ProfileDocument;

use super::user_store::{UserStore, UserStoreError, attributes};

/// Moves the profile attributes of a duplicate account onto the account being
/// kept. Keys the duplicate never had are left alone on both sides.
///
/// Returns the keys that moved.
pub async fn link_accounts<S>(
    store: &S,
    user_to_link: i64,
    user_to_keep: i64,
) -> Result<Vec<&'static str>, UserStoreError>
where
    S: UserStore + ?Sized,
{
    if user_to_link == user_to_keep {
        debug!(user_id = user_to_keep, "refusing to link an account to itself");
        return Ok(Vec::new());
    }

    let mut moved = Vec::new();
    let mut profile_data = None;

    for key in attributes::PROFILE_KEYS {
        let Some(value) = store.get_attribute(user_to_link, key).await? else {
            continue;
        };

        store.set_attribute(user_to_keep, key, &value).await?;
        store.delete_attribute(user_to_link, key).await?;

        if key == attributes::USER_PROFILE_DATA {
            profile_data = Some(value);
        }
        moved.push(key);
    }

    let display_name = profile_data
        .and_then(|raw| ProfileDocument::parse(&raw).ok())
        .and_then(|profile| profile.display_name.present().cloned());

    if let Some(display_name) = display_name {
        store
            .update_user(
                user_to_keep,
                &UpdateUser {
                    display_name: Some(display_name),
                    role: None,
                },
            )
            .await?;
    }

    info!(user_to_link, user_to_keep, moved = moved.len(), "linked accounts");
    Ok(moved)
}
