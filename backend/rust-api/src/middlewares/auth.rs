use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{Caller, Filter},
    handlers::ApiError,
    models::{
        profile::{ProfileRow, Profiles},
        UserRole,
    },
    services::AppState,
};

/// Audience the hosted auth service stamps on user access tokens.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims carried by the hosted auth service's access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupabaseClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role the request runs as, not the application role.
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token audience is not accepted")]
    InvalidAudience,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mints an HS256 token. The service never issues tokens itself; used by
    /// tests and local tooling.
    pub fn generate_token(&self, claims: &SupabaseClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<SupabaseClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        decode::<SupabaseClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Identity from the validated access token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Per-request auth state stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthUser,
    pub profile: Option<ProfileRow>,
    pub access_token: String,
}

impl AuthContext {
    pub fn role(&self) -> Option<UserRole> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    /// Database calls made on behalf of this user.
    pub fn caller(&self) -> Caller {
        Caller::user(self.user.id, self.access_token.clone())
    }
}

/// Teacher or admin, otherwise 403.
pub fn ensure_staff(ctx: &AuthContext) -> Result<UserRole, ApiError> {
    match ctx.role() {
        Some(role) if role.is_staff() => Ok(role),
        _ => Err(ApiError::Forbidden(
            "Teacher or admin role required".to_string(),
        )),
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Validates the bearer token and loads the caller's profile.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ApiError::Unauthorized(e.to_string())
    })?;

    let caller = Caller::user(claims.sub, token);
    let profile = state
        .db
        .from::<Profiles>()
        .select_one(&caller, Filter::new().eq("id", claims.sub))
        .await?;

    match &profile {
        Some(p) => tracing::debug!("Authenticated user: {} (role: {})", claims.sub, p.role),
        None => tracing::debug!("Authenticated user: {} (no profile)", claims.sub),
    }

    request.extensions_mut().insert(AuthContext {
        user: AuthUser {
            id: claims.sub,
            email: claims.email,
        },
        profile,
        access_token: token.to_string(),
    });

    Ok(next.run(request).await)
}

pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<AuthContext>()
        .map(AuthContext::is_admin)
        .unwrap_or(false);
    if is_admin {
        return Ok(next.run(request).await);
    }
    tracing::warn!("Access denied: admin role required");
    Err(ApiError::Forbidden("Admin role required".to_string()))
}
