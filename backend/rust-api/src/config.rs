use serde::Deserialize;
use std::{env, str::FromStr};

/// Which [`crate::db::DataStore`] backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Hosted REST API (default).
    Postgrest,
    /// In-process store for local demos and tests.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgrest" | "supabase" => Ok(StorageBackend::Postgrest),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(config::ConfigError::Message(format!(
                "unknown database.backend '{}', expected 'postgrest' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    pub dashboard_live_metrics: bool,
    pub http_timeout_secs: u64,
}

const DEV_JWT_SECRET: &str = "dev-secret-only-for-local-testing";

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (prefix: APP__)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings, &app_env)
    }

    fn from_settings(settings: &config::Config, app_env: &str) -> Result<Self, config::ConfigError> {
        let lookup = |key: &str, var: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(var).ok())
                .filter(|v| !v.trim().is_empty())
        };

        let supabase_url = lookup("supabase.url", "SUPABASE_URL")
            .unwrap_or_else(|| "http://localhost:54321".to_string());

        let storage_backend = lookup("database.backend", "DATABASE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StorageBackend::Postgrest);

        let supabase_anon_key = match lookup("supabase.anon_key", "SUPABASE_ANON_KEY") {
            Some(key) => key,
            None if storage_backend == StorageBackend::Memory => String::new(),
            None => {
                return Err(config::ConfigError::NotFound(
                    "supabase.anon_key (SUPABASE_ANON_KEY)".to_string(),
                ))
            }
        };

        let supabase_service_role_key =
            lookup("supabase.service_role_key", "SUPABASE_SERVICE_ROLE_KEY");

        let jwt_secret = match lookup("auth.jwt_secret", "SUPABASE_JWT_SECRET") {
            Some(secret) => secret,
            None if app_env == "prod" => {
                return Err(config::ConfigError::NotFound(
                    "auth.jwt_secret (SUPABASE_JWT_SECRET) must be set in production".to_string(),
                ))
            }
            None => {
                tracing::warn!("Using default JWT secret (dev mode only!)");
                DEV_JWT_SECRET.to_string()
            }
        };

        let bind_addr =
            lookup("server.bind_addr", "BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8081".to_string());

        let dashboard_live_metrics = match lookup("dashboard.live_metrics", "DASHBOARD_LIVE_METRICS")
        {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                config::ConfigError::Message(format!("dashboard.live_metrics: '{}' is not a bool", v))
            })?,
            None => false,
        };

        let http_timeout_secs = settings.get_int("http.timeout_secs").unwrap_or(10).max(1) as u64;

        Ok(Config {
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key,
            jwt_secret,
            bind_addr,
            storage_backend,
            dashboard_live_metrics,
            http_timeout_secs,
        })
    }

    /// In-memory configuration used by tests and demos.
    pub fn for_memory(jwt_secret: &str) -> Self {
        Config {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: None,
            jwt_secret: jwt_secret.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            storage_backend: StorageBackend::Memory,
            dashboard_live_metrics: false,
            http_timeout_secs: 10,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
