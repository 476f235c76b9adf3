//! Typed contract of the hosted database's `public` schema: one module per
//! table with its Row/Insert/Update shapes, the enum literal sets, and the
//! lookup helpers over table and enum names.

pub mod achievement;
pub mod dashboard;
pub mod emergency_procedure;
pub mod enums;
pub mod learning_module;
pub mod profile;
pub mod quiz_question;
pub mod table;
pub mod user_progress;

pub use enums::{DbEnum, DifficultyLevel, Enums, ModuleType, UserRole};
pub use table::{functions, Relationship, Table, TableName, Tables, TablesInsert, TablesUpdate};

/// Free-form JSON column (`jsonb`).
pub type Json = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown enum: {0}")]
    UnknownEnum(String),
    #[error("Invalid value {value:?} for enum {enum_name}")]
    UnknownVariant {
        enum_name: &'static str,
        value: String,
    },
}

impl SchemaError {
    pub fn unknown_variant<E: DbEnum>(value: &str) -> Self {
        SchemaError::UnknownVariant {
            enum_name: E::NAME,
            value: value.to_string(),
        }
    }
}

/// Serde adapter for nullable columns in partial updates: a missing field
/// stays `None`, an explicit `null` becomes `Some(None)`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
