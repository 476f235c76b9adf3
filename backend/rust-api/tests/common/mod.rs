#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use disasterprep_api::{
    config::Config,
    create_router,
    db::{Caller, DataStore, DbClient, MemoryStore},
    middlewares::auth::{JwtService, SupabaseClaims, AUTHENTICATED_AUDIENCE},
    models::{
        profile::{ProfileInsert, Profiles},
        UserRole,
    },
    services::{
        auth_service::{AuthGateway, GatewayError},
        AppState,
    },
};
use http_body_util::BodyExt;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-integration-tests";

/// Records sign-out calls instead of talking to the auth service.
#[derive(Default)]
pub struct FakeGateway {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeGateway {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn sign_out(&self, _access_token: &str) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 500,
                message: "auth service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DbClient,
    pub gateway: Arc<FakeGateway>,
    jwt: JwtService,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(Config::for_memory(TEST_JWT_SECRET)).await
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    let gateway = Arc::new(FakeGateway::default());
    let app_state = Arc::new(AppState::new(config, store, gateway.clone()));
    let db = app_state.db.clone();

    TestApp {
        router: create_router(app_state),
        db,
        gateway,
        jwt: JwtService::new(TEST_JWT_SECRET),
    }
}

impl TestApp {
    /// Access token as the hosted auth service would issue it.
    pub fn token_for(&self, user_id: Uuid) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        self.jwt
            .generate_token(&SupabaseClaims {
                sub: user_id,
                email: Some(format!("{}@example.com", user_id)),
                role: Some("authenticated".to_string()),
                aud: AUTHENTICATED_AUDIENCE.to_string(),
                exp: now + 3600,
                iat: now,
            })
            .unwrap()
    }

    pub async fn seed_profile(&self, full_name: &str, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .from::<Profiles>()
            .insert(
                &Caller::service(),
                &ProfileInsert {
                    id,
                    email: format!("{}@example.com", id),
                    full_name: full_name.to_string(),
                    avatar_url: None,
                    role: Some(role),
                    created_at: None,
                    updated_at: None,
                },
            )
            .await
            .unwrap();
        id
    }

    /// Seeds a profile and returns its id with a valid token.
    pub async fn login(&self, full_name: &str, role: UserRole) -> (Uuid, String) {
        let id = self.seed_profile(full_name, role).await;
        (id, self.token_for(id))
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
