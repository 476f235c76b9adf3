use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    double_option,
    table::{Relationship, Table, TableName},
};

/// `user_progress` table marker.
pub struct UserProgress;

impl Table for UserProgress {
    const NAME: &'static str = "user_progress";
    const TABLE: TableName = TableName::UserProgress;
    const RELATIONSHIPS: &'static [Relationship] = &[Relationship {
        foreign_key_name: "user_progress_module_id_fkey",
        columns: &["module_id"],
        is_one_to_one: false,
        referenced_relation: "learning_modules",
        referenced_columns: &["id"],
    }];

    type Row = UserProgressRow;
    type Insert = UserProgressInsert;
    type Update = UserProgressUpdate;
}

/// Per-user per-module state, one row per (user_id, module_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProgressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub attempts: i32,
    pub score: Option<i32>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgressInsert {
    pub user_id: Uuid,
    pub module_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub score: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One answer index per question, in question `order_index` order.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Too many answers"))]
    pub answers: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionFeedback {
    pub question_id: Uuid,
    pub selected: Option<i32>,
    pub correct: bool,
    pub correct_answer: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub module_id: Uuid,
    pub score: Option<i32>,
    pub passed: bool,
    pub correct_count: usize,
    pub question_count: usize,
    pub feedback: Vec<QuestionFeedback>,
    pub progress: UserProgressRow,
}
