use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use super::ApiError;
use crate::{
    middlewares::auth::AuthContext,
    models::dashboard::DashboardView,
    services::{dashboard_service::DashboardService, AppState},
};

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<DashboardView>, ApiError> {
    let service = DashboardService::new(state.db.clone(), state.config.dashboard_live_metrics);
    Ok(Json(service.render(&ctx).await?))
}
