use serde::{de::DeserializeOwned, Serialize};
use std::{fmt, str::FromStr};

use super::{
    achievement::{Achievements, UserAchievements},
    emergency_procedure::EmergencyProcedures,
    learning_module::LearningModules,
    profile::Profiles,
    quiz_question::QuizQuestions,
    user_progress::UserProgress,
    SchemaError,
};

/// Foreign key declared on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub foreign_key_name: &'static str,
    pub columns: &'static [&'static str],
    pub is_one_to_one: bool,
    pub referenced_relation: &'static str,
    pub referenced_columns: &'static [&'static str],
}

/// A table in the `public` schema together with its three record shapes.
pub trait Table: Send + Sync + 'static {
    const NAME: &'static str;
    const TABLE: TableName;
    const RELATIONSHIPS: &'static [Relationship] = &[];

    /// Shape returned by reads.
    type Row: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync;
    /// Shape accepted when creating a row; columns with server defaults are optional.
    type Insert: Serialize + fmt::Debug + Send + Sync;
    /// Partial modification; every column optional.
    type Update: Serialize + fmt::Debug + Send + Sync;
}

pub type Tables<T> = <T as Table>::Row;
pub type TablesInsert<T> = <T as Table>::Insert;
pub type TablesUpdate<T> = <T as Table>::Update;

/// Remote functions exposed by the schema.
pub mod functions {
    pub const GET_CURRENT_USER_ROLE: &str = "get_current_user_role";

    pub const ALL: [&str; 1] = [GET_CURRENT_USER_ROLE];

    pub fn is_declared(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Runtime name of every declared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Achievements,
    EmergencyProcedures,
    LearningModules,
    Profiles,
    QuizQuestions,
    UserAchievements,
    UserProgress,
}

impl TableName {
    pub const ALL: [TableName; 7] = [
        TableName::Achievements,
        TableName::EmergencyProcedures,
        TableName::LearningModules,
        TableName::Profiles,
        TableName::QuizQuestions,
        TableName::UserAchievements,
        TableName::UserProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Achievements => Achievements::NAME,
            TableName::EmergencyProcedures => EmergencyProcedures::NAME,
            TableName::LearningModules => LearningModules::NAME,
            TableName::Profiles => Profiles::NAME,
            TableName::QuizQuestions => QuizQuestions::NAME,
            TableName::UserAchievements => UserAchievements::NAME,
            TableName::UserProgress => UserProgress::NAME,
        }
    }

    pub fn relationships(&self) -> &'static [Relationship] {
        match self {
            TableName::Achievements => Achievements::RELATIONSHIPS,
            TableName::EmergencyProcedures => EmergencyProcedures::RELATIONSHIPS,
            TableName::LearningModules => LearningModules::RELATIONSHIPS,
            TableName::Profiles => Profiles::RELATIONSHIPS,
            TableName::QuizQuestions => QuizQuestions::RELATIONSHIPS,
            TableName::UserAchievements => UserAchievements::RELATIONSHIPS,
            TableName::UserProgress => UserProgress::RELATIONSHIPS,
        }
    }

    /// Columns declared `NOT NULL`, checked after server defaults apply.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableName::Achievements => &[
                "id",
                "title",
                "description",
                "criteria",
                "points",
                "created_at",
            ],
            TableName::EmergencyProcedures => &[
                "id",
                "title",
                "category",
                "steps",
                "created_at",
                "updated_at",
            ],
            TableName::LearningModules => &[
                "id",
                "title",
                "module_type",
                "difficulty_level",
                "order_index",
                "is_active",
                "created_at",
                "updated_at",
            ],
            TableName::Profiles => &[
                "id",
                "email",
                "full_name",
                "role",
                "created_at",
                "updated_at",
            ],
            TableName::QuizQuestions => &[
                "id",
                "module_id",
                "question",
                "options",
                "correct_answer",
                "order_index",
                "created_at",
            ],
            TableName::UserAchievements => &["id", "user_id", "achievement_id", "earned_at"],
            TableName::UserProgress => &[
                "id",
                "user_id",
                "module_id",
                "attempts",
                "is_completed",
                "created_at",
                "updated_at",
            ],
        }
    }

    /// Unique constraints beyond the primary key, as (constraint name, columns).
    pub fn unique_keys(&self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            TableName::UserAchievements => &[(
                "user_achievements_user_id_achievement_id_key",
                &["user_id", "achievement_id"],
            )],
            TableName::UserProgress => &[(
                "user_progress_user_id_module_id_key",
                &["user_id", "module_id"],
            )],
            _ => &[],
        }
    }

    /// Columns constrained to an enum type, as (column, enum name).
    pub fn enum_columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            TableName::LearningModules => &[
                ("module_type", "module_type"),
                ("difficulty_level", "difficulty_level"),
            ],
            TableName::Profiles => &[("role", "user_role")],
            _ => &[],
        }
    }
}

impl FromStr for TableName {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == value)
            .ok_or_else(|| SchemaError::UnknownTable(value.to_string()))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
