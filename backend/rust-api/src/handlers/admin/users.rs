use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    extractors::AppJson,
    handlers::ApiError,
    middlewares::auth::AuthContext,
    models::{
        achievement::{GrantAchievementRequest, UserAchievementRow},
        profile::{AdminUpdateProfileRequest, ListProfilesQuery, ProfileRow},
    },
    services::{achievement_service::AchievementService, auth_service::AuthService, AppState},
};

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListProfilesQuery>,
) -> Result<Json<Vec<ProfileRow>>, ApiError> {
    let service = AuthService::new(state.db.clone(), state.auth_gateway.clone());
    Ok(Json(service.list_profiles(&ctx, query).await?))
}

/// PATCH /admin/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    AppJson(req): AppJson<AdminUpdateProfileRequest>,
) -> Result<Json<ProfileRow>, ApiError> {
    req.validate().map_err(ApiError::validation)?;

    let service = AuthService::new(state.db.clone(), state.auth_gateway.clone());
    Ok(Json(service.admin_update_profile(&ctx, user_id, req).await?))
}

/// POST /admin/users/{id}/achievements
pub async fn grant_achievement(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    AppJson(req): AppJson<GrantAchievementRequest>,
) -> Result<(StatusCode, Json<UserAchievementRow>), ApiError> {
    let record = AchievementService::new(state.db.clone())
        .grant(&ctx, user_id, req.achievement_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
