use axum::{Json, Router, routing::get};
use services::services::settings::settings_fields;
use utils::{api::hooks::SettingsField, response::ApiResponse};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings/fields", get(fields))
}

async fn fields() -> Json<ApiResponse<Vec<SettingsField>>> {
    Json(ApiResponse::success(settings_fields()))
}
