//! Typed access to the hosted database service.
//!
//! [`DataStore`] is the JSON-level boundary (one implementation talks to the
//! hosted REST API, one keeps rows in memory). [`DbClient`] layers the schema
//! types from [`crate::models`] on top of it.

use async_trait::async_trait;
use std::{marker::PhantomData, sync::Arc};
use uuid::Uuid;

use crate::metrics;
use crate::models::{functions, Json, SchemaError, Table, TableName};

pub mod filter;
pub mod memory;
pub mod postgrest;

pub use filter::Filter;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Request to database service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Database service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to decode rows from {table}: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected response from database service: {0}")]
    UnexpectedResponse(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Invalid database configuration: {0}")]
    Config(String),
    #[error("Invalid filter value: {0}")]
    InvalidFilter(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Identity a database call is made on behalf of. The hosted service applies
/// row-level security using the access token.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub access_token: Option<String>,
}

impl Caller {
    /// Server-side calls that run with the service credentials.
    pub fn service() -> Self {
        Self::default()
    }

    pub fn user(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Caller {
            user_id: Some(user_id),
            access_token: Some(access_token.into()),
        }
    }
}

/// JSON-level CRUD over named tables plus remote function calls.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(
        &self,
        caller: &Caller,
        table: TableName,
        filter: &Filter,
    ) -> Result<Vec<Json>, DbError>;

    async fn count(&self, caller: &Caller, table: TableName, filter: &Filter)
        -> Result<u64, DbError>;

    /// Inserts one row and returns it as stored, server defaults applied.
    async fn insert(&self, caller: &Caller, table: TableName, row: Json) -> Result<Json, DbError>;

    /// Applies `patch` to every row matching `filter`; returns the updated rows.
    async fn update(
        &self,
        caller: &Caller,
        table: TableName,
        filter: &Filter,
        patch: Json,
    ) -> Result<Vec<Json>, DbError>;

    async fn rpc(&self, caller: &Caller, function: &str, args: Json) -> Result<Json, DbError>;

    async fn ping(&self) -> Result<(), DbError>;

    fn backend_name(&self) -> &'static str;
}

/// Schema-typed client over a [`DataStore`].
#[derive(Clone)]
pub struct DbClient {
    store: Arc<dyn DataStore>,
}

impl DbClient {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Typed handle on table `T`.
    pub fn from<T: Table>(&self) -> TableQuery<'_, T> {
        TableQuery {
            store: self.store.as_ref(),
            _table: PhantomData,
        }
    }

    /// Calls `get_current_user_role()`; `None` when the caller has no profile.
    pub async fn get_current_user_role(&self, caller: &Caller) -> Result<Option<String>, DbError> {
        let value = metrics::track_db_operation(
            "rpc",
            functions::GET_CURRENT_USER_ROLE,
            self.store
                .rpc(caller, functions::GET_CURRENT_USER_ROLE, Json::Object(Default::default())),
        )
        .await?;

        match value {
            Json::Null => Ok(None),
            Json::String(role) => Ok(Some(role)),
            other => Err(DbError::UnexpectedResponse(format!(
                "{} returned {} instead of text",
                functions::GET_CURRENT_USER_ROLE,
                other
            ))),
        }
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.store.ping().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}

/// Typed CRUD on one table.
pub struct TableQuery<'a, T: Table> {
    store: &'a dyn DataStore,
    _table: PhantomData<fn() -> T>,
}

impl<T: Table> TableQuery<'_, T> {
    pub async fn select(&self, caller: &Caller, filter: &Filter) -> Result<Vec<T::Row>, DbError> {
        filter.check()?;
        let rows = metrics::track_db_operation(
            "select",
            T::NAME,
            self.store.select(caller, T::TABLE, filter),
        )
        .await?;
        decode_rows::<T>(rows)
    }

    pub async fn select_one(
        &self,
        caller: &Caller,
        filter: Filter,
    ) -> Result<Option<T::Row>, DbError> {
        let mut rows = self.select(caller, &filter.limit(1)).await?;
        Ok(rows.pop())
    }

    pub async fn count(&self, caller: &Caller, filter: &Filter) -> Result<u64, DbError> {
        filter.check()?;
        metrics::track_db_operation(
            "count",
            T::NAME,
            self.store.count(caller, T::TABLE, filter),
        )
        .await
    }

    pub async fn insert(&self, caller: &Caller, row: &T::Insert) -> Result<T::Row, DbError> {
        let payload = encode::<T, _>(row)?;
        let stored = metrics::track_db_operation(
            "insert",
            T::NAME,
            self.store.insert(caller, T::TABLE, payload),
        )
        .await?;
        serde_json::from_value(stored).map_err(|source| DbError::Decode {
            table: T::NAME,
            source,
        })
    }

    pub async fn update(
        &self,
        caller: &Caller,
        filter: &Filter,
        patch: &T::Update,
    ) -> Result<Vec<T::Row>, DbError> {
        // An unfiltered update would rewrite the whole table.
        if !filter.has_conditions() {
            return Err(DbError::Constraint(format!(
                "refusing to update {} without a filter",
                T::NAME
            )));
        }
        filter.check()?;
        let payload = encode::<T, _>(patch)?;
        let rows = metrics::track_db_operation(
            "update",
            T::NAME,
            self.store.update(caller, T::TABLE, filter, payload),
        )
        .await?;
        decode_rows::<T>(rows)
    }
}

fn encode<T: Table, V: serde::Serialize>(value: &V) -> Result<Json, DbError> {
    serde_json::to_value(value).map_err(|source| DbError::Decode {
        table: T::NAME,
        source,
    })
}

fn decode_rows<T: Table>(rows: Vec<Json>) -> Result<Vec<T::Row>, DbError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| DbError::Decode {
                table: T::NAME,
                source,
            })
        })
        .collect()
}
