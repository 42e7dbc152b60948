//! Serializable dataset backing [`MemoryStore`](super::MemoryStore).
//!
//! A dataset is one JSON document holding the schema, the entities, the
//! relationship and custom-field registries, the users, the named filters
//! and the stored report definitions.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::{
    CustomFieldDef, CustomFieldId, Entity, EntityId, EntityKind, FieldDef, RelatedFieldDef,
    RelationType, UserId, Value,
};
use crate::model::ReportDefinition;

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read dataset: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate entity id {0}")]
    DuplicateEntity(EntityId),

    #[error("{context} references unknown entity {id}")]
    UnknownEntity { context: String, id: EntityId },
}

/// Everything a [`MemoryStore`](super::MemoryStore) serves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub schema: BTreeMap<EntityKind, KindSchema>,
    pub entities: Vec<Entity>,
    pub relation_types: Vec<RelationType>,
    pub relations: Vec<Relation>,
    pub custom_fields: Vec<CustomFieldDef>,
    pub custom_values: Vec<CustomValue>,
    pub users: Vec<User>,
    pub filters: Vec<EntityFilter>,
    pub reports: Vec<ReportDefinition>,
}

/// Attributes and reverse relations of one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindSchema {
    pub fields: Vec<FieldDef>,
    pub related: Vec<RelatedFieldDef>,
}

/// `subject --relation_type--> object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub subject: EntityId,
    pub relation_type: String,
    pub object: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomValue {
    pub entity: EntityId,
    pub field: CustomFieldId,
    pub value: Value,
}

/// A user and what they may see.
///
/// Superusers see everything; other users see the entities they own and
/// every entity of `viewable_kinds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub viewable_kinds: Vec<EntityKind>,
}

/// A named entity filter. All conditions must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub id: String,
    /// Kind this filter applies to; `None` applies to any kind.
    #[serde(default)]
    pub kind: Option<EntityKind>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl EntityFilter {
    pub fn applies_to(&self, kind: &EntityKind) -> bool {
        self.kind.as_ref().map_or(true, |k| k == kind)
    }

    pub fn accepts(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|c| c.accepts(entity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: ConditionOp,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Eq,
    Ne,
    /// Case-insensitive substring for text, membership for lists.
    Contains,
    Gt,
    Lt,
    Empty,
    NotEmpty,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: ConditionOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn accepts(&self, entity: &Entity) -> bool {
        let actual = entity.field(&self.field);
        match self.op {
            ConditionOp::Eq => values_equal(actual, &self.value),
            ConditionOp::Ne => !values_equal(actual, &self.value),
            ConditionOp::Contains => match (actual, &self.value) {
                (Value::Text(hay), Value::Text(needle)) => {
                    hay.to_lowercase().contains(&needle.to_lowercase())
                }
                (Value::List(items), needle) => items.iter().any(|i| values_equal(i, needle)),
                _ => false,
            },
            ConditionOp::Gt => compare(actual, &self.value) == Some(std::cmp::Ordering::Greater),
            ConditionOp::Lt => compare(actual, &self.value) == Some(std::cmp::Ordering::Less),
            ConditionOp::Empty => is_empty(actual),
            ConditionOp::NotEmpty => !is_empty(actual),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_datetime(), b.as_datetime()) {
        return Some(x.cmp(&y));
    }
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::FileNotFound(path.to_path_buf()));
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Entity ids are unique and relations and custom values point at
    /// existing entities.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let mut ids = HashSet::new();
        for entity in &self.entities {
            if !ids.insert(entity.id) {
                return Err(DatasetError::DuplicateEntity(entity.id));
            }
        }

        let require = |id: EntityId, context: &str| {
            if ids.contains(&id) {
                Ok(())
            } else {
                Err(DatasetError::UnknownEntity {
                    context: context.to_string(),
                    id,
                })
            }
        };
        for relation in &self.relations {
            let context = format!("relation '{}'", relation.relation_type);
            require(relation.subject, &context)?;
            require(relation.object, &context)?;
        }
        for value in &self.custom_values {
            require(value.entity, &format!("custom field {}", value.field))?;
        }
        Ok(())
    }
}
