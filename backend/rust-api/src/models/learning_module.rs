use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    double_option,
    quiz_question::QuizQuestionView,
    table::{Table, TableName},
    DifficultyLevel, ModuleType,
};

/// `learning_modules` table marker.
pub struct LearningModules;

impl Table for LearningModules {
    const NAME: &'static str = "learning_modules";
    const TABLE: TableName = TableName::LearningModules;

    type Row = LearningModuleRow;
    type Insert = LearningModuleInsert;
    type Update = LearningModuleUpdate;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningModuleRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub module_type: ModuleType,
    pub difficulty_level: DifficultyLevel,
    pub order_index: i32,
    pub passing_score: Option<i32>,
    pub is_active: bool,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningModuleInsert {
    pub title: String,
    pub module_type: ModuleType,
    pub order_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningModuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub content: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub passing_score: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub video_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub created_by: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub module_type: ModuleType,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 0, message = "order_index must not be negative"))]
    pub order_index: i32,
    #[validate(range(min = 0, max = 100, message = "passing_score must be within 0..=100"))]
    pub passing_score: Option<i32>,
    pub is_active: Option<bool>,
    #[validate(url(message = "thumbnail_url must be a valid URL"))]
    pub thumbnail_url: Option<String>,
    #[validate(url(message = "video_url must be a valid URL"))]
    pub video_url: Option<String>,
}

impl CreateModuleRequest {
    pub fn into_insert(self, created_by: Uuid) -> LearningModuleInsert {
        LearningModuleInsert {
            title: self.title,
            module_type: self.module_type,
            order_index: self.order_index,
            id: None,
            description: self.description,
            content: self.content,
            difficulty_level: self.difficulty_level,
            passing_score: self.passing_score,
            is_active: self.is_active,
            thumbnail_url: self.thumbnail_url,
            video_url: self.video_url,
            created_by: Some(created_by),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateModuleRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub content: Option<Option<String>>,
    pub module_type: Option<ModuleType>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 0, message = "order_index must not be negative"))]
    pub order_index: Option<i32>,
    #[serde(default, with = "double_option")]
    pub passing_score: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl UpdateModuleRequest {
    pub fn passing_score_in_range(&self) -> bool {
        match self.passing_score {
            Some(Some(score)) => (0..=100).contains(&score),
            _ => true,
        }
    }
}

impl From<UpdateModuleRequest> for LearningModuleUpdate {
    fn from(req: UpdateModuleRequest) -> Self {
        LearningModuleUpdate {
            title: req.title,
            description: req.description,
            content: req.content,
            module_type: req.module_type,
            difficulty_level: req.difficulty_level,
            order_index: req.order_index,
            passing_score: req.passing_score,
            is_active: req.is_active,
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListModulesQuery {
    #[serde(default)]
    pub include_inactive: bool,
    pub module_type: Option<ModuleType>,
    pub difficulty_level: Option<DifficultyLevel>,
}

/// Module with its quiz questions in `order_index` order.
#[derive(Debug, Serialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: LearningModuleRow,
    pub questions: Vec<QuizQuestionView>,
}
