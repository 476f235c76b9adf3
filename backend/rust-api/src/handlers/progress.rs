use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use super::ApiError;
use crate::{
    middlewares::auth::AuthContext,
    models::{achievement::AchievementsOverview, user_progress::UserProgressRow},
    services::{
        achievement_service::AchievementService, progress_service::ProgressService, AppState,
    },
};

/// GET /api/v1/progress
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<UserProgressRow>>, ApiError> {
    Ok(Json(ProgressService::new(state.db.clone()).list_own(&ctx).await?))
}

/// GET /api/v1/achievements
pub async fn achievements(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<AchievementsOverview>, ApiError> {
    Ok(Json(
        AchievementService::new(state.db.clone())
            .overview(&ctx)
            .await?,
    ))
}
