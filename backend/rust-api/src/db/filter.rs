use serde::Serialize;
use std::cmp::Ordering;

use super::DbError;
use crate::models::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Is,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Is => "is",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Row filter, ordering and limit for a table read or update.
///
/// Encodes to the hosted REST API's query syntax (`column=op.value`) and can
/// be evaluated in-process against JSON rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
    order: Vec<Order>,
    limit: Option<usize>,
    /// First condition value that failed to serialize.
    invalid: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: &str, op: Operator, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.conditions.push(Condition {
                column: column.to_string(),
                op,
                value,
            }),
            Err(e) => {
                if self.invalid.is_none() {
                    self.invalid = Some(format!("{} {}: {}", column, op.as_str(), e));
                }
            }
        }
        self
    }

    /// Fails when any condition value could not be serialized.
    pub fn check(&self) -> Result<(), DbError> {
        match &self.invalid {
            Some(message) => Err(DbError::InvalidFilter(message.clone())),
            None => Ok(()),
        }
    }

    pub fn eq(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Eq, value)
    }

    pub fn neq(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Neq, value)
    }

    pub fn gt(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Gte, value)
    }

    pub fn lt(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl Serialize) -> Self {
        self.push(column, Operator::Lte, value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(column, Operator::Is, Json::Null)
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Query pairs for the REST API, e.g. `("role", "eq.teacher")`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .conditions
            .iter()
            .map(|condition| {
                (
                    condition.column.clone(),
                    format!("{}.{}", condition.op.as_str(), literal(&condition.value)),
                )
            })
            .collect();

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }

    /// Whether `row` satisfies every condition. Missing columns read as null.
    pub fn matches(&self, row: &Json) -> bool {
        self.conditions.iter().all(|condition| {
            let actual = row.get(&condition.column).unwrap_or(&Json::Null);
            let expected = &condition.value;
            match condition.op {
                Operator::Eq => !actual.is_null() && values_equal(actual, expected),
                Operator::Neq => !actual.is_null() && !values_equal(actual, expected),
                Operator::Is => actual == expected,
                Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
                Operator::Gte => matches!(
                    compare(actual, expected),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
                Operator::Lte => matches!(
                    compare(actual, expected),
                    Some(Ordering::Less | Ordering::Equal)
                ),
            }
        })
    }

    /// Filters, orders and limits `rows` the way the database would.
    pub fn apply(&self, rows: impl IntoIterator<Item = Json>) -> Vec<Json> {
        let mut selected: Vec<Json> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if !self.order.is_empty() {
            selected.sort_by(|a, b| {
                for order in &self.order {
                    let left = a.get(&order.column).unwrap_or(&Json::Null);
                    let right = b.get(&order.column).unwrap_or(&Json::Null);
                    let ordering = order_with_nulls(left, right, order.ascending);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

fn literal(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(_), Json::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Json, b: &Json) -> Option<Ordering> {
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        (Json::Bool(x), Json::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Postgres default: NULLS LAST when ascending, NULLS FIRST when descending.
fn order_with_nulls(a: &Json, b: &Json, ascending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if ascending {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, true) => {
            if ascending {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, false) => {
            let ordering = compare(a, b).unwrap_or(Ordering::Equal);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
    }
}
