use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::{
    db::{Caller, DbClient, Filter},
    metrics,
    middlewares::auth::{AuthContext, AuthUser},
    models::{
        profile::{
            AdminUpdateProfileRequest, ListProfilesQuery, ProfileRow, ProfileUpdate, Profiles,
            UpdateOwnProfileRequest,
        },
        UserRole,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Auth service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid auth service configuration: {0}")]
    Config(String),
}

/// The hosted auth provider, as far as this service uses it.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), GatewayError>;
}

/// GoTrue-compatible auth API at `{base_url}/auth/v1`.
pub struct GoTrueGateway {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
}

impl GoTrueGateway {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("invalid auth url {}: {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            auth_url: format!("{}/auth/v1", parsed.as_str().trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        })
    }
}

#[async_trait]
impl AuthGateway for GoTrueGateway {
    async fn sign_out(&self, access_token: &str) -> Result<(), GatewayError> {
        let response = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// `GET /api/v1/auth/me` payload.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: AuthUser,
    pub profile: Option<ProfileRow>,
    /// What `get_current_user_role()` reports for this caller.
    pub role: Option<String>,
}

pub struct AuthService {
    db: DbClient,
    gateway: Arc<dyn AuthGateway>,
}

impl AuthService {
    pub fn new(db: DbClient, gateway: Arc<dyn AuthGateway>) -> Self {
        Self { db, gateway }
    }

    /// Delegates to the auth provider exactly once and waits for it.
    pub async fn sign_out(&self, ctx: &AuthContext) -> ServiceResult<()> {
        let result = self.gateway.sign_out(&ctx.access_token).await;
        metrics::record_sign_out(result.is_ok());

        match result {
            Ok(()) => {
                tracing::info!(user_id = %ctx.user.id, "User signed out");
                Ok(())
            }
            Err(e) => {
                tracing::error!(user_id = %ctx.user.id, "Sign-out failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn me(&self, ctx: &AuthContext) -> ServiceResult<MeResponse> {
        let role = self.db.get_current_user_role(&ctx.caller()).await?;
        Ok(MeResponse {
            user: ctx.user.clone(),
            profile: ctx.profile.clone(),
            role,
        })
    }

    pub async fn update_own_profile(
        &self,
        ctx: &AuthContext,
        req: UpdateOwnProfileRequest,
    ) -> ServiceResult<ProfileRow> {
        if ctx.profile.is_none() {
            return Err(ServiceError::NotFound("Profile not found".to_string()));
        }
        self.update_profile(&ctx.caller(), ctx.user.id, req.into())
            .await
    }

    pub async fn list_profiles(
        &self,
        ctx: &AuthContext,
        query: ListProfilesQuery,
    ) -> ServiceResult<Vec<ProfileRow>> {
        let mut filter = Filter::new().order("created_at", false);
        if let Some(role) = query.role {
            filter = filter.eq("role", role);
        }
        filter = filter.limit(query.limit.unwrap_or(100).clamp(1, 500));

        Ok(self.db.from::<Profiles>().select(&ctx.caller(), &filter).await?)
    }

    pub async fn admin_update_profile(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        req: AdminUpdateProfileRequest,
    ) -> ServiceResult<ProfileRow> {
        if user_id == ctx.user.id && req.role.is_some_and(|role| role != UserRole::Admin) {
            return Err(ServiceError::Invalid(
                "Admins cannot remove their own admin role".to_string(),
            ));
        }
        let role_change = req.role;
        let profile = self
            .update_profile(&ctx.caller(), user_id, req.into())
            .await?;
        if let Some(role) = role_change {
            tracing::info!(admin_id = %ctx.user.id, %user_id, %role, "Profile role changed");
        }
        Ok(profile)
    }

    async fn update_profile(
        &self,
        caller: &Caller,
        user_id: Uuid,
        mut patch: ProfileUpdate,
    ) -> ServiceResult<ProfileRow> {
        patch.updated_at.get_or_insert_with(Utc::now);
        self.db
            .from::<Profiles>()
            .update(caller, &Filter::new().eq("id", user_id), &patch)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Profile {} not found", user_id)))
    }
}
