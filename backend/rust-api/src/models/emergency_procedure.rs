use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, table::{Table, TableName}, Json};

/// `emergency_procedures` table marker. Standalone reference content.
pub struct EmergencyProcedures;

impl Table for EmergencyProcedures {
    const NAME: &'static str = "emergency_procedures";
    const TABLE: TableName = TableName::EmergencyProcedures;

    type Row = EmergencyProcedureRow;
    type Insert = EmergencyProcedureInsert;
    type Update = EmergencyProcedureUpdate;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyProcedureRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub steps: Json,
    pub warning_text: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmergencyProcedureRow {
    /// Steps as text; non-string entries are skipped.
    pub fn step_list(&self) -> Vec<&str> {
        self.steps
            .as_array()
            .map(|steps| steps.iter().filter_map(Json::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyProcedureInsert {
    pub title: String,
    pub category: String,
    pub steps: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyProcedureUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub warning_text: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub video_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProcedureRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, max = 50, message = "Category must not be empty"))]
    pub category: String,
    #[validate(length(min = 1, message = "A procedure needs at least one step"))]
    pub steps: Vec<String>,
    pub warning_text: Option<String>,
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(url(message = "video_url must be a valid URL"))]
    pub video_url: Option<String>,
}

impl From<CreateProcedureRequest> for EmergencyProcedureInsert {
    fn from(req: CreateProcedureRequest) -> Self {
        EmergencyProcedureInsert {
            title: req.title,
            category: req.category,
            steps: Json::from(req.steps),
            id: None,
            warning_text: req.warning_text,
            image_url: req.image_url,
            video_url: req.video_url,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProcedureRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Category must not be empty"))]
    pub category: Option<String>,
    #[validate(length(min = 1, message = "A procedure needs at least one step"))]
    pub steps: Option<Vec<String>>,
    #[serde(default, with = "double_option")]
    pub warning_text: Option<Option<String>>,
}

impl From<UpdateProcedureRequest> for EmergencyProcedureUpdate {
    fn from(req: UpdateProcedureRequest) -> Self {
        EmergencyProcedureUpdate {
            title: req.title,
            category: req.category,
            steps: req.steps.map(Json::from),
            warning_text: req.warning_text,
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProceduresQuery {
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_list_reads_string_steps() {
        let mut row = EmergencyProcedureRow {
            id: Uuid::new_v4(),
            title: "House Fire".to_string(),
            category: "fire".to_string(),
            steps: serde_json::json!(["Get low", 2, "Get out"]),
            warning_text: None,
            image_url: None,
            video_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(row.step_list(), vec!["Get low", "Get out"]);

        row.steps = serde_json::json!({ "not": "a list" });
        assert!(row.step_list().is_empty());
    }

    #[test]
    fn test_update_keeps_absent_warning_untouched() {
        let req: UpdateProcedureRequest =
            serde_json::from_value(serde_json::json!({ "title": "Wildfire" })).unwrap();
        let patch = EmergencyProcedureUpdate::from(req);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["title"], "Wildfire");
        assert!(json.get("warning_text").is_none());

        let req: UpdateProcedureRequest =
            serde_json::from_value(serde_json::json!({ "warning_text": null })).unwrap();
        let json = serde_json::to_value(EmergencyProcedureUpdate::from(req)).unwrap();
        assert!(json["warning_text"].is_null());
        assert!(json.as_object().unwrap().contains_key("warning_text"));
    }
}
