use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::{
    extractors::AppJson,
    middlewares::auth::AuthContext,
    models::profile::{ProfileRow, UpdateOwnProfileRequest},
    services::{
        auth_service::{AuthService, MeResponse},
        AppState,
    },
};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.auth_gateway.clone())
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(auth_service(&state).me(&ctx).await?))
}

/// PATCH /api/v1/auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateOwnProfileRequest>,
) -> Result<Json<ProfileRow>, ApiError> {
    req.validate().map_err(ApiError::validation)?;
    if !req.avatar_url_is_valid() {
        return Err(ApiError::bad_request("avatar_url must be an http(s) URL"));
    }

    let profile = auth_service(&state).update_own_profile(&ctx, req).await?;
    Ok(Json(profile))
}

/// POST /api/v1/auth/sign-out
///
/// Responds only after the auth provider has invalidated the session.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<StatusCode, ApiError> {
    auth_service(&state).sign_out(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
