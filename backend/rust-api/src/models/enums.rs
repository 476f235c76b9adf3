use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::SchemaError;

/// Postgres enum type declared in the `public` schema.
pub trait DbEnum: Sized + Copy + 'static {
    /// Enum type name as declared in the database.
    const NAME: &'static str;
    /// Allowed literals, in declaration order.
    const LITERALS: &'static [&'static str];

    fn as_str(&self) -> &'static str;
}

/// `user_role` enum: admin | teacher | student
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    #[default]
    Student,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Teacher, UserRole::Student];

    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Teacher)
    }
}

impl DbEnum for UserRole {
    const NAME: &'static str = "user_role";
    const LITERALS: &'static [&'static str] = &["admin", "teacher", "student"];

    fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }
}

impl FromStr for UserRole {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            _ => Err(SchemaError::unknown_variant::<Self>(value)),
        }
    }
}

/// `module_type` enum: theory | quiz | game | emergency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Theory,
    Quiz,
    Game,
    Emergency,
}

impl DbEnum for ModuleType {
    const NAME: &'static str = "module_type";
    const LITERALS: &'static [&'static str] = &["theory", "quiz", "game", "emergency"];

    fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Theory => "theory",
            ModuleType::Quiz => "quiz",
            ModuleType::Game => "game",
            ModuleType::Emergency => "emergency",
        }
    }
}

impl FromStr for ModuleType {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "theory" => Ok(ModuleType::Theory),
            "quiz" => Ok(ModuleType::Quiz),
            "game" => Ok(ModuleType::Game),
            "emergency" => Ok(ModuleType::Emergency),
            _ => Err(SchemaError::unknown_variant::<Self>(value)),
        }
    }
}

/// `difficulty_level` enum: beginner | intermediate | advanced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl DbEnum for DifficultyLevel {
    const NAME: &'static str = "difficulty_level";
    const LITERALS: &'static [&'static str] = &["beginner", "intermediate", "advanced"];

    fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            _ => Err(SchemaError::unknown_variant::<Self>(value)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(UserRole, ModuleType, DifficultyLevel);

/// Runtime lookup over every enum declared in the schema.
pub struct Enums;

impl Enums {
    fn lookup(name: &str) -> Option<(&'static str, &'static [&'static str])> {
        match name {
            DifficultyLevel::NAME => Some((DifficultyLevel::NAME, DifficultyLevel::LITERALS)),
            ModuleType::NAME => Some((ModuleType::NAME, ModuleType::LITERALS)),
            UserRole::NAME => Some((UserRole::NAME, UserRole::LITERALS)),
            _ => None,
        }
    }

    /// Literal set of the named enum, `None` for names the schema does not declare.
    pub fn values(name: &str) -> Option<&'static [&'static str]> {
        Self::lookup(name).map(|(_, literals)| literals)
    }

    /// Checks `value` against the named enum's literal set.
    pub fn check(name: &str, value: &str) -> Result<(), SchemaError> {
        let (enum_name, literals) =
            Self::lookup(name).ok_or_else(|| SchemaError::UnknownEnum(name.to_string()))?;
        if literals.contains(&value) {
            Ok(())
        } else {
            Err(SchemaError::UnknownVariant {
                enum_name,
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_sets_round_trip_through_from_str() {
        for literal in UserRole::LITERALS {
            assert_eq!(UserRole::from_str(literal).unwrap().as_str(), *literal);
        }
        for literal in ModuleType::LITERALS {
            assert_eq!(ModuleType::from_str(literal).unwrap().as_str(), *literal);
        }
        for literal in DifficultyLevel::LITERALS {
            assert_eq!(DifficultyLevel::from_str(literal).unwrap().as_str(), *literal);
        }
    }

    #[test]
    fn test_enums_lookup_resolves_declared_names_only() {
        assert_eq!(
            Enums::values("user_role"),
            Some(&["admin", "teacher", "student"][..])
        );
        assert_eq!(
            Enums::values("module_type"),
            Some(&["theory", "quiz", "game", "emergency"][..])
        );
        assert_eq!(
            Enums::values("difficulty_level"),
            Some(&["beginner", "intermediate", "advanced"][..])
        );
        assert_eq!(Enums::values("mood"), None);
    }

    #[test]
    fn test_check_rejects_values_outside_literal_set() {
        assert!(Enums::check("user_role", "teacher").is_ok());
        assert!(matches!(
            Enums::check("user_role", "sysadmin"),
            Err(SchemaError::UnknownVariant { enum_name: "user_role", .. })
        ));
        assert!(matches!(
            Enums::check("colour", "red"),
            Err(SchemaError::UnknownEnum(_))
        ));
    }

    #[test]
    fn test_check_reports_enum_name_from_runtime_string() {
        let name = String::from("difficulty_level");
        let err = Enums::check(&name, "expert").unwrap_err();
        drop(name);
        match err {
            SchemaError::UnknownVariant { enum_name, value } => {
                assert_eq!(enum_name, DifficultyLevel::NAME);
                assert_eq!(value, "expert");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serde_uses_lowercase_literals() {
        assert_eq!(serde_json::to_string(&UserRole::Teacher).unwrap(), "\"teacher\"");
        let level: DifficultyLevel = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(level, DifficultyLevel::Advanced);
        assert!(serde_json::from_str::<ModuleType>("\"lecture\"").is_err());
    }

    #[test]
    fn test_defaults_match_column_defaults() {
        assert_eq!(UserRole::default(), UserRole::Student);
        assert_eq!(DifficultyLevel::default(), DifficultyLevel::Beginner);
    }
}
