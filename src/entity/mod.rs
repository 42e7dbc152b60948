//! Entities and the collaborators the engine reads them through.
//!
//! The engine never stores entities. Everything it knows about them comes
//! from the traits in [`backend`]: an entity source, a visibility filter,
//! and the custom-field, relationship, function-field and schema registries.

pub mod backend;
mod value;

pub use backend::{
    Backend, CustomFieldDef, CustomFieldRegistry, EntitySource, FieldDef, FieldType,
    FunctionFieldRegistry, RelatedFieldDef, RelationRegistry, RelationType, ScalarType, Schema,
    VisibilityFilter,
};
pub use value::Value;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an entity. Unique across every entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of an entity kind (`Contact`, `Organisation`, `Invoice`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(pub String);

impl EntityKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A user that reports are fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a custom (dynamically typed) attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFieldId(pub u32);

impl fmt::Display for CustomFieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored entity as handed to the engine by its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Default string representation.
    pub label: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(id: u64, kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            kind: EntityKind::new(kind),
            label: label.into(),
            owner: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(UserId::new(owner));
        self
    }

    /// Raw attribute value; missing attributes read as [`Value::Null`].
    pub fn field(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(name).unwrap_or(&NULL)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
