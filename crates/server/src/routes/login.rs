use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use db::models::session::Session;
use services::services::{
    cancellation::{self, SessionTerminator},
    user_store::UserStoreError,
};
use sqlx::SqlitePool;
use tracing::debug;
use url::Url;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "profile_sync_session";

pub fn router() -> Router<AppState> {
    Router::new().route("/login", get(login))
}

/// Marked `Secure` when the site is served over https.
pub(crate) fn session_cookie(token: String, site_url: Option<&Url>) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(site_url.is_some_and(|site| site.scheme() == "https"))
        .build()
}

/// Revokes the session named by the request's cookie, if there is one.
struct CookieSession<'a> {
    pool: &'a SqlitePool,
    token: Option<String>,
}

#[async_trait]
impl SessionTerminator for CookieSession<'_> {
    async fn logout(&self) -> Result<(), UserStoreError> {
        let Some(token) = self.token.as_deref() else {
            debug!("no session cookie to revoke");
            return Ok(());
        };

        let revoked = Session::revoke(self.pool, token).await?;
        debug!(revoked, "session revoked");
        Ok(())
    }
}

/// Sign-in page entry. Only `action=logout` requests that cancel profile
/// creation are handled here; everything else is acknowledged and left to the
/// host.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    if !cancellation::is_logout(&params) {
        return Ok(Json(ApiResponse::success(false)).into_response());
    }

    let session = CookieSession {
        pool: state.pool(),
        token: jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string()),
    };

    match state.sync().on_logout_request(&params, &session).await? {
        Some(target) => {
            let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
            Ok((jar, Redirect::to(&target)).into_response())
        }
        None => Ok(Json(ApiResponse::success(false)).into_response()),
    }
}
