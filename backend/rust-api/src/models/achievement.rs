use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    double_option,
    table::{Relationship, Table, TableName},
    Json,
};

/// `achievements` table marker (badge catalog).
pub struct Achievements;

impl Table for Achievements {
    const NAME: &'static str = "achievements";
    const TABLE: TableName = TableName::Achievements;

    type Row = AchievementRow;
    type Insert = AchievementInsert;
    type Update = AchievementUpdate;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub badge_icon: Option<String>,
    pub criteria: Json,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementInsert {
    pub title: String,
    pub description: String,
    pub criteria: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub badge_icon: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// `user_achievements` table marker (earned-badge join records).
pub struct UserAchievements;

impl Table for UserAchievements {
    const NAME: &'static str = "user_achievements";
    const TABLE: TableName = TableName::UserAchievements;
    const RELATIONSHIPS: &'static [Relationship] = &[Relationship {
        foreign_key_name: "user_achievements_achievement_id_fkey",
        columns: &["achievement_id"],
        is_one_to_one: false,
        referenced_relation: "achievements",
        referenced_columns: &["id"],
    }];

    type Row = UserAchievementRow;
    type Insert = UserAchievementInsert;
    type Update = UserAchievementUpdate;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAchievementRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievementInsert {
    pub user_id: Uuid,
    pub achievement_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAchievementUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievement_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAchievementRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "Description must not be empty"))]
    pub description: String,
    pub badge_icon: Option<String>,
    #[serde(default = "empty_criteria")]
    pub criteria: Json,
    #[validate(range(min = 0, message = "Points must not be negative"))]
    pub points: Option<i32>,
}

fn empty_criteria() -> Json {
    Json::Object(Default::default())
}

impl From<CreateAchievementRequest> for AchievementInsert {
    fn from(req: CreateAchievementRequest) -> Self {
        AchievementInsert {
            title: req.title,
            description: req.description,
            criteria: req.criteria,
            id: None,
            badge_icon: req.badge_icon,
            points: req.points,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantAchievementRequest {
    pub achievement_id: Uuid,
}

/// Badge catalog plus what the caller has earned.
#[derive(Debug, Serialize)]
pub struct AchievementsOverview {
    pub catalog: Vec<AchievementRow>,
    pub earned: Vec<UserAchievementRow>,
    pub total_points: i64,
}

impl AchievementsOverview {
    pub fn new(catalog: Vec<AchievementRow>, earned: Vec<UserAchievementRow>) -> Self {
        let total_points = earned_points(&catalog, &earned);
        AchievementsOverview {
            catalog,
            earned,
            total_points,
        }
    }
}

/// Sum of catalog points over the earned records; unknown badges count zero.
pub fn earned_points(catalog: &[AchievementRow], earned: &[UserAchievementRow]) -> i64 {
    earned
        .iter()
        .filter_map(|record| {
            catalog
                .iter()
                .find(|achievement| achievement.id == record.achievement_id)
        })
        .map(|achievement| i64::from(achievement.points))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(points: i32) -> AchievementRow {
        AchievementRow {
            id: Uuid::new_v4(),
            title: "First Responder".to_string(),
            description: "Finished CPR training".to_string(),
            badge_icon: Some("heart".to_string()),
            criteria: serde_json::json!({ "modules_completed": 1 }),
            points,
            created_at: Utc::now(),
        }
    }

    fn earned(user_id: Uuid, achievement: &AchievementRow) -> UserAchievementRow {
        UserAchievementRow {
            id: Uuid::new_v4(),
            user_id,
            achievement_id: achievement.id,
            earned_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_points_sums_earned_badges() {
        let user = Uuid::new_v4();
        let a = badge(100);
        let b = badge(50);
        let c = badge(25);
        let records = vec![earned(user, &a), earned(user, &b)];

        let overview = AchievementsOverview::new(vec![a, b, c], records);
        assert_eq!(overview.total_points, 150);
        assert_eq!(overview.earned.len(), 2);
    }

    #[test]
    fn test_request_defaults_criteria_to_empty_object() {
        let req: CreateAchievementRequest = serde_json::from_value(serde_json::json!({
            "title": "Prepared",
            "description": "Built an emergency kit"
        }))
        .unwrap();
        assert_eq!(req.criteria, serde_json::json!({}));

        let insert = AchievementInsert::from(req);
        let json = serde_json::to_value(insert).unwrap();
        assert!(json.get("points").is_none());
    }
}
