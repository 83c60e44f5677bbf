use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{profile_sync::ProfileSyncError, user_store::UserStoreError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    UserStore(#[from] UserStoreError),
    #[error(transparent)]
    ProfileSync(#[from] ProfileSyncError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UserStore(UserStoreError::UserNotFound(_)) => StatusCode::NOT_FOUND,
            Self::ProfileSync(ProfileSyncError::Store(UserStoreError::UserNotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            Self::ProfileSync(
                ProfileSyncError::BadRemoteResponse { .. }
                | ProfileSyncError::MissingProfileFields
                | ProfileSyncError::Remote { .. },
            ) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UserStore(_) | Self::ProfileSync(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = match &self {
            Self::UserStore(UserStoreError::Database(_))
            | Self::ProfileSync(ProfileSyncError::Store(UserStoreError::Database(_)))
            | Self::Database(_) => {
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
