use db::models::user::User;
use tracing::{debug, info};

use super::user_store::{UserStore, UserStoreError, attributes};

/// The PUID is whatever follows the last `:` in the claim. A claim without a
/// colon is taken whole; one ending in a colon yields an empty PUID.
pub fn extract_puid(claim: &str) -> &str {
    let claim = claim.trim();
    claim
        .rsplit_once(':')
        .map_or(claim, |(_, puid)| puid)
}

/// Looks up the account already bound to the claim's PUID. On a match the raw
/// claim is recorded on that user; `None` lets the caller create an account.
pub async fn resolve_identity<S>(store: &S, claim: &str) -> Result<Option<User>, UserStoreError>
where
    S: UserStore + ?Sized,
{
    let puid = extract_puid(claim);
    if puid.is_empty() {
        debug!("claim carries no puid");
        return Ok(None);
    }

    let Some(user) = store.find_by_attribute(attributes::USER_PUID, puid).await? else {
        debug!(puid, "no user bound to puid");
        return Ok(None);
    };

    store
        .set_attribute(user.id, attributes::SSO_ALTSECID, claim.trim())
        .await?;
    info!(user_id = user.id, puid, "resolved identity by puid");

    Ok(Some(user))
}
