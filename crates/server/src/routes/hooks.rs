use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::post,
};
use axum_extra::extract::CookieJar;
use db::models::{session::Session, user::User};
use services::services::profile_sync::HookOutcome;
use tracing::{info, instrument};
use url::Url;
use utils::{
    api::hooks::{
        LinkAccountsRequest, ResolveIdentityRequest, ResolveIdentityResponse, SignInRequest,
        SignInResponse, UserHookRequest,
    },
    response::ApiResponse,
};

use super::login::session_cookie;
use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hooks/sign-in", post(sign_in))
        .route("/hooks/user-found", post(user_found))
        .route("/hooks/new-user", post(new_user))
        .route("/hooks/resolve-identity", post(resolve_identity))
        .route("/hooks/link-accounts", post(link_accounts))
}

fn parse_return_to(return_to: Option<&str>) -> Result<Option<Url>, ApiError> {
    return_to
        .map(|value| {
            Url::parse(value).map_err(|e| ApiError::BadRequest(format!("invalid return_to: {e}")))
        })
        .transpose()
}

fn hook_response<T: serde::Serialize>(outcome: HookOutcome, data: T) -> Response {
    match outcome {
        HookOutcome::Continue => Json(ApiResponse::success(data)).into_response(),
        HookOutcome::Redirect(target) => Redirect::to(target.as_str()).into_response(),
    }
}

/// Resolves the claim to an account, creating one when nobody owns the PUID,
/// syncs the profile and opens a session.
#[instrument(name = "hooks.sign_in", skip(state, jar, request), fields(login = %request.login))]
async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<Response, ApiError> {
    let return_to = parse_return_to(request.return_to.as_deref())?;
    let sync = state.sync();

    let (user, new_user) = match sync.on_resolve_identity(&request.altsecid).await? {
        Some(user) => (user, false),
        None => {
            if User::find_by_login(state.pool(), &request.login)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict(format!(
                    "login {} is taken",
                    request.login
                )));
            }
            let user =
                User::create(state.pool(), &request.login, &sync.settings().default_role).await?;
            info!(user_id = user.id, "created user for unmatched identity");
            (user, true)
        }
    };

    let outcome = if new_user {
        sync.on_new_user(user.id, &request.altsecid, return_to.as_ref())
            .await?
    } else {
        sync.on_user_found(user.id, &request.altsecid, return_to.as_ref())
            .await?
    };

    let session = Session::create(state.pool(), user.id).await?;
    let jar = jar.add(session_cookie(
        session.token,
        sync.settings().site_url.as_ref(),
    ));

    let data = SignInResponse {
        user_id: user.id,
        new_user,
    };
    Ok((jar, hook_response(outcome, data)).into_response())
}

#[instrument(name = "hooks.user_found", skip(state, request), fields(user_id = request.user_id))]
async fn user_found(
    State(state): State<AppState>,
    Json(request): Json<UserHookRequest>,
) -> Result<Response, ApiError> {
    let return_to = parse_return_to(request.return_to.as_deref())?;
    let outcome = state
        .sync()
        .on_user_found(request.user_id, &request.altsecid, return_to.as_ref())
        .await?;
    Ok(hook_response(outcome, request.user_id))
}

#[instrument(name = "hooks.new_user", skip(state, request), fields(user_id = request.user_id))]
async fn new_user(
    State(state): State<AppState>,
    Json(request): Json<UserHookRequest>,
) -> Result<Response, ApiError> {
    let return_to = parse_return_to(request.return_to.as_deref())?;
    let outcome = state
        .sync()
        .on_new_user(request.user_id, &request.altsecid, return_to.as_ref())
        .await?;
    Ok(hook_response(outcome, request.user_id))
}

async fn resolve_identity(
    State(state): State<AppState>,
    Json(request): Json<ResolveIdentityRequest>,
) -> Result<Json<ApiResponse<ResolveIdentityResponse>>, ApiError> {
    let user = state.sync().on_resolve_identity(&request.altsecid).await?;
    Ok(Json(ApiResponse::success(ResolveIdentityResponse {
        user_id: user.map(|user| user.id),
    })))
}

async fn link_accounts(
    State(state): State<AppState>,
    Json(request): Json<LinkAccountsRequest>,
) -> Result<Json<ApiResponse<Vec<&'static str>>>, ApiError> {
    let moved = state
        .sync()
        .on_link_accounts(request.user_to_link, request.user_to_keep)
        .await?;
    Ok(Json(ApiResponse::success(moved)))
}
