//! [`DataStore`] backed by the hosted service's PostgREST endpoint.

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{Caller, DataStore, DbError, Filter};
use crate::models::{functions, Json, TableName};
use crate::utils::retry::{retry_async_if, RetryConfig};

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Postgres error codes that indicate a violated table constraint.
const CONSTRAINT_CODES: &[&str] = &["23505", "23503", "23502", "22P02", "23514"];

pub struct PostgrestStore {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    service_key: Option<String>,
    read_retry: RetryConfig,
}

impl PostgrestStore {
    pub fn new(
        base_url: &str,
        anon_key: impl Into<String>,
        service_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DbError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| DbError::Config(format!("invalid service url {}: {}", base_url, e)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", parsed.as_str().trim_end_matches('/')),
            anon_key: anon_key.into(),
            service_key,
            read_retry: RetryConfig::default(),
        })
    }

    pub fn with_read_retry(mut self, config: RetryConfig) -> Self {
        self.read_retry = config;
        self
    }

    fn bearer<'a>(&'a self, caller: &'a Caller) -> &'a str {
        caller
            .access_token
            .as_deref()
            .or(self.service_key.as_deref())
            .unwrap_or(&self.anon_key)
    }

    fn request(&self, method: Method, path: &str, caller: &Caller) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(caller))
    }

    async fn send_read(
        &self,
        build: impl Fn() -> RequestBuilder,
        table: &str,
    ) -> Result<Response, DbError> {
        retry_async_if(
            self.read_retry.clone(),
            || async { check_status(build().send().await?).await },
            is_transient,
        )
        .await
        .inspect_err(|e| tracing::warn!(table, error = %e, "database read failed"))
    }
}

fn is_transient(error: &DbError) -> bool {
    match error {
        DbError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        DbError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

async fn check_status(response: Response) -> Result<Response, DbError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_error(status, &body))
}

fn map_error(status: StatusCode, body: &str) -> DbError {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|p| p.code.clone());
    let message = parsed
        .as_ref()
        .and_then(|p| match (&p.message, &p.details) {
            (Some(m), Some(d)) => Some(format!("{} ({})", m, d)),
            (Some(m), None) => Some(m.clone()),
            _ => None,
        })
        .unwrap_or_else(|| body.to_string());

    let is_constraint = status == StatusCode::CONFLICT
        || code
            .as_deref()
            .map(|c| CONSTRAINT_CODES.contains(&c))
            .unwrap_or(false);

    if is_constraint {
        DbError::Constraint(message)
    } else {
        DbError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

/// Total from a `Content-Range` header such as `0-24/42` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn json_body(response: Response, table: &'static str) -> Result<Json, DbError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Json::Null);
    }
    serde_json::from_slice(&bytes).map_err(|source| DbError::Decode { table, source })
}

fn rows_of(value: Json) -> Result<Vec<Json>, DbError> {
    match value {
        Json::Array(rows) => Ok(rows),
        Json::Null => Ok(Vec::new()),
        other => Err(DbError::UnexpectedResponse(format!(
            "expected a row array, got {}",
            other
        ))),
    }
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn select(
        &self,
        caller: &Caller,
        table: TableName,
        filter: &Filter,
    ) -> Result<Vec<Json>, DbError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter.to_query_pairs());

        let response = self
            .send_read(
                || self.request(Method::GET, table.as_str(), caller).query(&query),
                table.as_str(),
            )
            .await?;
        rows_of(json_body(response, table.as_str()).await?)
    }

    async fn count(
        &self,
        caller: &Caller,
        table: TableName,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        let query = filter.to_query_pairs();
        let response = self
            .send_read(
                || {
                    self.request(Method::HEAD, table.as_str(), caller)
                        .query(&query)
                        .header("Prefer", "count=exact")
                },
                table.as_str(),
            )
            .await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DbError::UnexpectedResponse("missing Content-Range header".into()))?;
        parse_content_range_total(range)
            .ok_or_else(|| DbError::UnexpectedResponse(format!("bad Content-Range: {}", range)))
    }

    async fn insert(&self, caller: &Caller, table: TableName, row: Json) -> Result<Json, DbError> {
        let response = self
            .request(Method::POST, table.as_str(), caller)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = check_status(response).await?;

        rows_of(json_body(response, table.as_str()).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::UnexpectedResponse(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        caller: &Caller,
        table: TableName,
        filter: &Filter,
        patch: Json,
    ) -> Result<Vec<Json>, DbError> {
        let response = self
            .request(Method::PATCH, table.as_str(), caller)
            .query(&filter.to_query_pairs())
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        let response = check_status(response).await?;
        rows_of(json_body(response, table.as_str()).await?)
    }

    async fn rpc(&self, caller: &Caller, function: &str, args: Json) -> Result<Json, DbError> {
        if !functions::is_declared(function) {
            return Err(DbError::UnknownFunction(function.to_string()));
        }
        let path = format!("rpc/{}", function);
        let response = self
            .send_read(
                || self.request(Method::POST, &path, caller).json(&args),
                "rpc",
            )
            .await?;
        json_body(response, "rpc").await
    }

    async fn ping(&self) -> Result<(), DbError> {
        // The root path serves the OpenAPI description; any 2xx means reachable.
        let response = self
            .http
            .get(format!("{}/", self.rest_url))
            .header("apikey", &self.anon_key)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "postgrest"
    }
}
