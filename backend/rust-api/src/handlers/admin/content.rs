use axum::{
    extract::{Path, State},
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
        achievement::{AchievementRow, CreateAchievementRequest},
        emergency_procedure::{
            CreateProcedureRequest, EmergencyProcedureRow, UpdateProcedureRequest,
        },
    },
    services::{achievement_service::AchievementService, content_service::ContentService, AppState},
};

/// POST /admin/achievements
pub async fn create_achievement(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    AppJson(req): AppJson<CreateAchievementRequest>,
) -> Result<(StatusCode, Json<AchievementRow>), ApiError> {
    req.validate().map_err(ApiError::validation)?;

    let achievement = AchievementService::new(state.db.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(achievement)))
}

/// POST /admin/emergency-procedures
pub async fn create_procedure(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    AppJson(req): AppJson<CreateProcedureRequest>,
) -> Result<(StatusCode, Json<EmergencyProcedureRow>), ApiError> {
    req.validate().map_err(ApiError::validation)?;

    let procedure = ContentService::new(state.db.clone())
        .create_procedure(&ctx, req)
        .await?;
    tracing::info!(procedure_id = %procedure.id, admin_id = %ctx.user.id, "Emergency procedure created");
    Ok((StatusCode::CREATED, Json(procedure)))
}

/// PATCH /admin/emergency-procedures/{id}
pub async fn update_procedure(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateProcedureRequest>,
) -> Result<Json<EmergencyProcedureRow>, ApiError> {
    req.validate().map_err(ApiError::validation)?;

    let procedure = ContentService::new(state.db.clone())
        .update_procedure(&ctx, id, req)
        .await?;
    Ok(Json(procedure))
}
