use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use db::models::user::User;
use serde::Deserialize;
use services::services::{
    affiliation::Viewer,
    profile_sync::{SyncOptions, SyncOutcome},
    user_store::{UserStore, attributes},
};
use tracing::instrument;
use utils::{api::hooks::RegistrationResponse, response::ApiResponse};

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/sync", post(sync_user))
        .route("/users/{user_id}/registration", get(registration))
}

/// Re-syncs a user from the PUID stored at their last sign-in. There is no
/// browser to send anywhere, so a missing profile is reported as an error.
#[instrument(name = "users.sync", skip(state))]
async fn sync_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let sync = state.sync();
    let puid = sync
        .store()
        .get_attribute(user_id, attributes::USER_PUID)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} has no stored puid")))?;

    match sync.sync(user_id, &puid, SyncOptions::default()).await? {
        SyncOutcome::Synced => {}
        SyncOutcome::ProfileRequired { .. } => {
            return Err(ApiError::Conflict("profile creation required".to_string()));
        }
    }

    let user = User::find_by_id(state.pool(), user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id}")))?;
    Ok(Json(ApiResponse::success(user)))
}

#[derive(Debug, Deserialize)]
struct RegistrationQuery {
    #[serde(default)]
    super_admin: bool,
}

async fn registration(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<RegistrationQuery>,
) -> Result<Json<ApiResponse<RegistrationResponse>>, ApiError> {
    let registration = state
        .sync()
        .registration_mode(Viewer {
            user_id,
            super_admin: query.super_admin,
        })
        .await?;

    Ok(Json(ApiResponse::success(RegistrationResponse {
        user_id,
        registration,
    })))
}
