//! In-process [`DataStore`] used by tests and local demo runs. Mirrors what
//! the hosted service does on write: column defaults, NOT NULL columns,
//! unique keys, foreign keys and enum literal checks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Caller, DataStore, DbError, Filter};
use crate::models::{functions, Enums, Json, TableName};

type Row = serde_json::Map<String, Json>;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<TableName, Vec<Json>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for `table`.
    pub async fn len(&self, table: TableName) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Server-side column defaults applied on insert.
fn column_defaults(table: TableName) -> Vec<(&'static str, Json)> {
    let now = serde_json::to_value(Utc::now()).unwrap_or(Json::Null);
    let id = Json::String(Uuid::new_v4().to_string());

    let mut defaults = vec![("id", id)];
    match table {
        TableName::Achievements => {
            defaults.push(("points", Json::from(0)));
            defaults.push(("created_at", now));
        }
        TableName::EmergencyProcedures => {
            defaults.push(("created_at", now.clone()));
            defaults.push(("updated_at", now));
        }
        TableName::LearningModules => {
            defaults.push(("difficulty_level", Json::from("beginner")));
            defaults.push(("is_active", Json::Bool(true)));
            defaults.push(("created_at", now.clone()));
            defaults.push(("updated_at", now));
        }
        TableName::Profiles => {
            defaults.push(("role", Json::from("student")));
            defaults.push(("created_at", now.clone()));
            defaults.push(("updated_at", now));
        }
        TableName::QuizQuestions => {
            defaults.push(("created_at", now));
        }
        TableName::UserAchievements => {
            defaults.push(("earned_at", now));
        }
        TableName::UserProgress => {
            defaults.push(("attempts", Json::from(0)));
            defaults.push(("is_completed", Json::Bool(false)));
            defaults.push(("created_at", now.clone()));
            defaults.push(("updated_at", now));
        }
    }
    defaults
}

fn as_object(table: TableName, value: Json) -> Result<Row, DbError> {
    match value {
        Json::Object(map) => Ok(map),
        other => Err(DbError::Constraint(format!(
            "{} expects a JSON object, got {}",
            table, other
        ))),
    }
}

fn check_enums(table: TableName, row: &Row) -> Result<(), DbError> {
    for (column, enum_name) in table.enum_columns() {
        match row.get(*column) {
            None | Some(Json::Null) => {}
            Some(Json::String(value)) => Enums::check(enum_name, value)
                .map_err(|e| DbError::Constraint(format!("{}.{}: {}", table, column, e)))?,
            Some(other) => {
                return Err(DbError::Constraint(format!(
                    "{}.{}: expected {} literal, got {}",
                    table, column, enum_name, other
                )))
            }
        }
    }
    Ok(())
}

fn check_foreign_keys(
    tables: &HashMap<TableName, Vec<Json>>,
    table: TableName,
    row: &Row,
) -> Result<(), DbError> {
    for relationship in table.relationships() {
        for (column, referenced_column) in relationship
            .columns
            .iter()
            .zip(relationship.referenced_columns.iter())
        {
            let Some(value) = row.get(*column).filter(|v| !v.is_null()) else {
                continue;
            };
            let referenced: TableName = relationship.referenced_relation.parse()?;
            let exists = tables
                .get(&referenced)
                .map(|rows| rows.iter().any(|r| r.get(*referenced_column) == Some(value)))
                .unwrap_or(false);
            if !exists {
                return Err(DbError::Constraint(format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
                    table, relationship.foreign_key_name
                )));
            }
        }
    }
    Ok(())
}

fn not_null_violation(table: TableName, column: &str) -> DbError {
    DbError::Constraint(format!(
        "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
        column, table
    ))
}

/// On insert every required column must be present; on update only columns
/// the patch names are checked.
fn check_not_null(table: TableName, row: &Row, partial: bool) -> Result<(), DbError> {
    for column in table.required_columns() {
        let violates = match row.get(*column) {
            None => !partial,
            Some(value) => value.is_null(),
        };
        if violates {
            return Err(not_null_violation(table, column));
        }
    }
    Ok(())
}

/// Unique keys other than the primary key. `skip` selects rows the write
/// itself replaces.
fn check_unique_keys(
    rows: &[Json],
    table: TableName,
    row: &Row,
    skip: impl Fn(&Json) -> bool,
) -> Result<(), DbError> {
    for (constraint, columns) in table.unique_keys() {
        let clash = rows.iter().filter(|existing| !skip(existing)).any(|existing| {
            columns
                .iter()
                .all(|column| existing.get(*column) == row.get(*column))
        });
        if clash {
            return Err(DbError::Constraint(format!(
                "duplicate key value violates unique constraint \"{}\"",
                constraint
            )));
        }
    }
    Ok(())
}

fn check_primary_key(rows: &[Json], table: TableName, row: &Row) -> Result<(), DbError> {
    let id = row.get("id");
    if id.is_none() || id == Some(&Json::Null) {
        return Err(not_null_violation(table, "id"));
    }
    if rows.iter().any(|existing| existing.get("id") == id) {
        return Err(DbError::Constraint(format!(
            "duplicate key value violates unique constraint \"{}_pkey\"",
            table
        )));
    }
    Ok(())
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(
        &self,
        _caller: &Caller,
        table: TableName,
        filter: &Filter,
    ) -> Result<Vec<Json>, DbError> {
        let tables = self.tables.read().await;
        let rows = tables.get(&table).cloned().unwrap_or_default();
        Ok(filter.apply(rows))
    }

    async fn count(
        &self,
        _caller: &Caller,
        table: TableName,
        filter: &Filter,
    ) -> Result<u64, DbError> {
        let tables = self.tables.read().await;
        let count = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert(&self, _caller: &Caller, table: TableName, row: Json) -> Result<Json, DbError> {
        let mut row = as_object(table, row)?;
        for (column, value) in column_defaults(table) {
            let missing = row.get(column).map(Json::is_null).unwrap_or(true);
            // Profiles take their id from the auth user; never generate one.
            if missing && !(table == TableName::Profiles && column == "id") {
                row.insert(column.to_string(), value);
            }
        }

        check_enums(table, &row)?;
        check_not_null(table, &row, false)?;

        let mut tables = self.tables.write().await;
        check_foreign_keys(&tables, table, &row)?;
        let rows = tables.entry(table).or_default();
        check_primary_key(rows, table, &row)?;
        check_unique_keys(rows, table, &row, |_| false)?;

        let stored = Json::Object(row);
        rows.push(stored.clone());
        tracing::debug!(table = %table, "memory store insert");
        Ok(stored)
    }

    async fn update(
        &self,
        _caller: &Caller,
        table: TableName,
        filter: &Filter,
        patch: Json,
    ) -> Result<Vec<Json>, DbError> {
        let patch = as_object(table, patch)?;
        check_enums(table, &patch)?;
        check_not_null(table, &patch, true)?;

        let mut tables = self.tables.write().await;
        check_foreign_keys(&tables, table, &patch)?;

        let rows = tables.entry(table).or_default();
        let touches_unique_key = table
            .unique_keys()
            .iter()
            .any(|(_, columns)| columns.iter().any(|column| patch.contains_key(*column)));
        if touches_unique_key {
            let mut staged: Vec<Row> = Vec::new();
            for row in rows.iter().filter(|row| filter.matches(row)) {
                let mut merged = as_object(table, row.clone())?;
                for (column, value) in &patch {
                    merged.insert(column.clone(), value.clone());
                }
                check_unique_keys(rows.as_slice(), table, &merged, |existing| {
                    filter.matches(existing)
                })?;
                check_unique_keys(
                    &staged.iter().cloned().map(Json::Object).collect::<Vec<_>>(),
                    table,
                    &merged,
                    |_| false,
                )?;
                staged.push(merged);
            }
        }
        if let Some(new_id) = patch.get("id") {
            let matched = rows.iter().filter(|row| filter.matches(row)).count();
            let taken = rows
                .iter()
                .any(|row| row.get("id") == Some(new_id) && !filter.matches(row));
            if matched > 1 || taken {
                return Err(DbError::Constraint(format!(
                    "duplicate key value violates unique constraint \"{}_pkey\"",
                    table
                )));
            }
        }

        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if !filter.matches(row) {
                continue;
            }
            if let Json::Object(map) = row {
                for (column, value) in &patch {
                    map.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn rpc(&self, caller: &Caller, function: &str, _args: Json) -> Result<Json, DbError> {
        if function != functions::GET_CURRENT_USER_ROLE {
            return Err(DbError::UnknownFunction(function.to_string()));
        }

        let Some(user_id) = caller.user_id else {
            return Ok(Json::Null);
        };
        let tables = self.tables.read().await;
        let role = tables
            .get(&TableName::Profiles)
            .and_then(|rows| {
                rows.iter()
                    .find(|row| row.get("id") == Some(&Json::String(user_id.to_string())))
            })
            .and_then(|row| row.get("role").cloned())
            .unwrap_or(Json::Null);
        Ok(role)
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
