use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ApiError;
use crate::{
    extractors::AppJson,
    middlewares::auth::{ensure_staff, AuthContext},
    models::{
        emergency_procedure::{EmergencyProcedureRow, ListProceduresQuery},
        learning_module::{
            CreateModuleRequest, LearningModuleRow, ListModulesQuery, ModuleDetail,
            UpdateModuleRequest,
        },
        quiz_question::{CreateQuestionRequest, QuizQuestionRow},
        user_progress::{AttemptResult, SubmitAttemptRequest},
    },
    services::{content_service::ContentService, progress_service::ProgressService, AppState},
};

pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListModulesQuery>,
) -> Result<Json<Vec<LearningModuleRow>>, ApiError> {
    let modules = ContentService::new(state.db.clone())
        .list_modules(&ctx, query)
        .await?;
    Ok(Json(modules))
}

/// Answer keys are only included for teachers and admins.
pub async fn get_module(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModuleDetail>, ApiError> {
    let detail = ContentService::new(state.db.clone())
        .module_detail(&ctx, id)
        .await?;
    Ok(Json(detail))
}

pub async fn create_module(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    AppJson(req): AppJson<CreateModuleRequest>,
) -> Result<(StatusCode, Json<LearningModuleRow>), ApiError> {
    ensure_staff(&ctx)?;
    req.validate().map_err(ApiError::validation)?;

    let module = ContentService::new(state.db.clone())
        .create_module(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(module)))
}

pub async fn update_module(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateModuleRequest>,
) -> Result<Json<LearningModuleRow>, ApiError> {
    ensure_staff(&ctx)?;
    req.validate().map_err(ApiError::validation)?;
    if !req.passing_score_in_range() {
        return Err(ApiError::bad_request("passing_score must be between 0 and 100"));
    }

    let module = ContentService::new(state.db.clone())
        .update_module(&ctx, id, req)
        .await?;
    Ok(Json(module))
}

pub async fn add_question(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(module_id): Path<Uuid>,
    AppJson(req): AppJson<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuizQuestionRow>), ApiError> {
    ensure_staff(&ctx)?;
    req.validate().map_err(ApiError::validation)?;

    let question = ContentService::new(state.db.clone())
        .add_question(&ctx, module_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(module_id): Path<Uuid>,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<Json<AttemptResult>, ApiError> {
    req.validate().map_err(ApiError::validation)?;

    let result = ProgressService::new(state.db.clone())
        .submit_attempt(&ctx, module_id, req)
        .await?;
    Ok(Json(result))
}

pub async fn list_procedures(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListProceduresQuery>,
) -> Result<Json<Vec<EmergencyProcedureRow>>, ApiError> {
    let procedures = ContentService::new(state.db.clone())
        .list_procedures(&ctx, query)
        .await?;
    Ok(Json(procedures))
}

pub async fn get_procedure(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmergencyProcedureRow>, ApiError> {
    let procedure = ContentService::new(state.db.clone())
        .get_procedure(&ctx, id)
        .await?;
    Ok(Json(procedure))
}
