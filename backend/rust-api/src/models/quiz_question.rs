use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    double_option,
    table::{Relationship, Table, TableName},
    Json,
};

/// `quiz_questions` table marker.
pub struct QuizQuestions;

impl Table for QuizQuestions {
    const NAME: &'static str = "quiz_questions";
    const TABLE: TableName = TableName::QuizQuestions;
    const RELATIONSHIPS: &'static [Relationship] = &[Relationship {
        foreign_key_name: "quiz_questions_module_id_fkey",
        columns: &["module_id"],
        is_one_to_one: false,
        referenced_relation: "learning_modules",
        referenced_columns: &["id"],
    }];

    type Row = QuizQuestionRow;
    type Insert = QuizQuestionInsert;
    type Update = QuizQuestionUpdate;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestionRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub question: String,
    pub options: Json,
    pub correct_answer: i32,
    pub explanation: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

impl QuizQuestionRow {
    /// Number of answer options stored in the `options` list.
    pub fn option_count(&self) -> usize {
        self.options.as_array().map(Vec::len).unwrap_or(0)
    }

    /// Option labels in answer-index order; non-string entries are skipped.
    pub fn option_labels(&self) -> Vec<&str> {
        self.options
            .as_array()
            .map(|options| options.iter().filter_map(Json::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestionInsert {
    pub module_id: Uuid,
    pub question: String,
    pub options: Json,
    pub correct_answer: i32,
    pub order_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizQuestionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub explanation: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Question as shown to a caller; answers are withheld from students.
#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestionView {
    pub id: Uuid,
    pub question: String,
    pub options: Json,
    pub order_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestionView {
    pub fn new(row: QuizQuestionRow, reveal_answers: bool) -> Self {
        QuizQuestionView {
            id: row.id,
            question: row.question,
            options: row.options,
            order_index: row.order_index,
            correct_answer: reveal_answers.then_some(row.correct_answer),
            explanation: if reveal_answers { row.explanation } else { None },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question must not be empty"))]
    pub question: String,
    #[validate(length(min = 2, max = 10, message = "A question needs 2 to 10 options"))]
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub explanation: Option<String>,
    #[validate(range(min = 0, message = "order_index must not be negative"))]
    pub order_index: i32,
}

impl CreateQuestionRequest {
    pub fn correct_answer_in_range(&self) -> bool {
        usize::try_from(self.correct_answer)
            .map(|index| index < self.options.len())
            .unwrap_or(false)
    }

    pub fn into_insert(self, module_id: Uuid) -> QuizQuestionInsert {
        QuizQuestionInsert {
            module_id,
            question: self.question,
            options: Json::from(self.options),
            correct_answer: self.correct_answer,
            order_index: self.order_index,
            id: None,
            explanation: self.explanation,
            created_at: None,
        }
    }
}
