use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, table::{Table, TableName}, UserRole};

/// `profiles` table marker.
pub struct Profiles;

impl Table for Profiles {
    const NAME: &'static str = "profiles";
    const TABLE: TableName = TableName::Profiles;

    type Row = ProfileRow;
    type Insert = ProfileInsert;
    type Update = ProfileUpdate;
}

/// Application-level user record; `id` equals the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// First word of the full name, empty when the name is blank.
    pub fn first_name(&self) -> &str {
        self.full_name.split(' ').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInsert {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Self-service profile edit; role changes go through the admin endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOwnProfileRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name must be between 1 and 100 characters"
    ))]
    pub full_name: Option<String>,
    #[serde(default, with = "double_option")]
    pub avatar_url: Option<Option<String>>,
}

impl UpdateOwnProfileRequest {
    /// A non-null avatar must be an absolute URL.
    pub fn avatar_url_is_valid(&self) -> bool {
        match &self.avatar_url {
            Some(Some(value)) => url::Url::parse(value).is_ok(),
            _ => true,
        }
    }
}

impl From<UpdateOwnProfileRequest> for ProfileUpdate {
    fn from(req: UpdateOwnProfileRequest) -> Self {
        ProfileUpdate {
            full_name: req.full_name,
            avatar_url: req.avatar_url,
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// Admin edit of any profile.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminUpdateProfileRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name must be between 1 and 100 characters"
    ))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

impl From<AdminUpdateProfileRequest> for ProfileUpdate {
    fn from(req: AdminUpdateProfileRequest) -> Self {
        ProfileUpdate {
            email: req.email,
            full_name: req.full_name,
            role: req.role,
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListProfilesQuery {
    pub role: Option<UserRole>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_only_present_columns() {
        let update = ProfileUpdate {
            full_name: Some("Ana Lima".to_string()),
            avatar_url: Some(None),
            ..Default::default()
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "full_name": "Ana Lima", "avatar_url": null })
        );
    }

    #[test]
    fn test_own_profile_request_distinguishes_null_from_absent() {
        let cleared: UpdateOwnProfileRequest =
            serde_json::from_str(r#"{"avatar_url": null}"#).unwrap();
        assert_eq!(cleared.avatar_url, Some(None));

        let untouched: UpdateOwnProfileRequest =
            serde_json::from_str(r#"{"full_name": "Ana"}"#).unwrap();
        assert_eq!(untouched.avatar_url, None);
    }

    #[test]
    fn test_first_name() {
        let profile = ProfileRow {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            full_name: "Ana Maria Lima".to_string(),
            avatar_url: None,
            role: UserRole::Student,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(profile.first_name(), "Ana");
    }
}
