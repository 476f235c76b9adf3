use std::{sync::Arc, time::Duration};

use crate::{
    config::{Config, StorageBackend},
    db::{DataStore, DbClient, DbError, MemoryStore, PostgrestStore},
    middlewares::auth::JwtService,
};

pub mod achievement_service;
pub mod auth_service;
pub mod content_service;
pub mod dashboard_service;
pub mod progress_service;

use auth_service::{AuthGateway, GatewayError, GoTrueGateway};

pub struct AppState {
    pub config: Config,
    pub db: DbClient,
    pub auth_gateway: Arc<dyn AuthGateway>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DataStore>, auth_gateway: Arc<dyn AuthGateway>) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            config,
            db: DbClient::new(store),
            auth_gateway,
            jwt,
        }
    }

    /// Wires the configured backend and the hosted auth gateway.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let store: Arc<dyn DataStore> = match config.storage_backend {
            StorageBackend::Postgrest => Arc::new(PostgrestStore::new(
                &config.supabase_url,
                config.supabase_anon_key.clone(),
                config.supabase_service_role_key.clone(),
                timeout,
            )?),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        match tokio::time::timeout(Duration::from_secs(5), store.ping()).await {
            Ok(Ok(())) => tracing::info!("Database backend '{}' reachable", store.backend_name()),
            Ok(Err(e)) => tracing::warn!("Database backend not reachable yet: {}", e),
            Err(_) => tracing::warn!("Database ping timed out after 5s"),
        }

        let gateway = GoTrueGateway::new(&config.supabase_url, &config.supabase_anon_key, timeout)?;

        Ok(Self::new(config, store, Arc::new(gateway)))
    }
}

/// Failures shared by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
