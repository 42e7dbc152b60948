//! Collaborator traits consumed by the engine.
//!
//! None of these are implemented by the core. A host system plugs its own
//! storage, permission and registry layers in here; [`crate::memory`] provides
//! an in-memory implementation of all of them.

use serde::{Deserialize, Serialize};

use super::{CustomFieldId, Entity, EntityId, EntityKind, UserId, Value};
use crate::engine::context::DateRange;
use crate::engine::error::ComputationError;
use crate::model::FilterRef;

// ============================================================================
// Traits
// ============================================================================

/// Yields the base entity set of a report.
pub trait EntitySource: Send + Sync {
    /// Entities of `kind` matching `filter` and `date_range`, in a stable order.
    fn query(
        &self,
        kind: &EntityKind,
        filter: Option<&FilterRef>,
        date_range: Option<&DateRange>,
    ) -> Vec<Entity>;

    /// Fetch one entity by id.
    fn get(&self, id: EntityId) -> Option<Entity>;

    /// Entities of `kind` whose attribute `field` references `target`.
    fn referencing(&self, kind: &EntityKind, field: &str, target: EntityId) -> Vec<Entity>;
}

/// Per-user visibility of entities.
pub trait VisibilityFilter: Send + Sync {
    fn is_viewable(&self, entity: &Entity, user: &UserId) -> bool;
}

/// Registry of custom attributes and their per-entity values.
pub trait CustomFieldRegistry: Send + Sync {
    fn field(&self, id: CustomFieldId) -> Option<CustomFieldDef>;

    fn value(&self, entity: &Entity, id: CustomFieldId) -> Option<Value>;
}

/// Registry of relationship types and the relationships between entities.
pub trait RelationRegistry: Send + Sync {
    fn relation_type(&self, id: &str) -> Option<RelationType>;

    /// Objects related to `entity` through `relation_type`.
    ///
    /// Duplicates are allowed here; the engine deduplicates.
    fn related_entities(&self, entity: &Entity, relation_type: &str) -> Vec<Entity>;
}

/// Registry of computed-value providers.
pub trait FunctionFieldRegistry: Send + Sync {
    fn compute(&self, provider: &str, entity: &Entity) -> Result<String, ComputationError>;
}

/// Static description of entity kinds.
pub trait Schema: Send + Sync {
    fn field(&self, kind: &EntityKind, name: &str) -> Option<FieldDef>;

    fn related_field(&self, kind: &EntityKind, name: &str) -> Option<RelatedFieldDef>;
}

// ============================================================================
// Registry types
// ============================================================================

/// A custom attribute declared for an entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub id: CustomFieldId,
    pub kind: EntityKind,
    pub name: String,
    pub value_type: ScalarType,
}

/// A relationship type, e.g. `employed_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    pub id: String,
    pub label: String,
    /// Kinds allowed as relationship objects. Empty means any kind.
    #[serde(default)]
    pub object_kinds: Vec<EntityKind>,
}

impl RelationType {
    pub fn accepts(&self, kind: &EntityKind) -> bool {
        self.object_kinds.is_empty() || self.object_kinds.contains(kind)
    }
}

/// A regular attribute of an entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub verbose_name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Scalar { value_type: ScalarType },
    /// Points to one entity of `target`.
    ForeignKey { target: EntityKind },
    /// Points to any number of entities of `target`.
    ManyToMany { target: EntityKind },
}

impl FieldType {
    /// Kind of entity this attribute links to, if any.
    pub fn target(&self) -> Option<&EntityKind> {
        match self {
            FieldType::Scalar { .. } => None,
            FieldType::ForeignKey { target } | FieldType::ManyToMany { target } => Some(target),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Scalar {
                value_type: ScalarType::Int | ScalarType::Decimal
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int,
    Decimal,
    Text,
    Date,
    DateTime,
}

impl ScalarType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Decimal)
    }
}

/// Reverse side of a foreign attribute declared on another kind,
/// e.g. the documents stored in a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedFieldDef {
    pub name: String,
    pub verbose_name: String,
    /// Kind declaring the foreign attribute.
    pub target: EntityKind,
    /// Foreign attribute on `target` pointing back at the base entity.
    pub reverse_field: String,
}

// ============================================================================
// Bundle
// ============================================================================

/// One reference to each collaborator, handed to the engine and the linker.
#[derive(Clone, Copy)]
pub struct Backend<'a> {
    pub entities: &'a dyn EntitySource,
    pub visibility: &'a dyn VisibilityFilter,
    pub custom_fields: &'a dyn CustomFieldRegistry,
    pub relations: &'a dyn RelationRegistry,
    pub functions: &'a dyn FunctionFieldRegistry,
    pub schema: &'a dyn Schema,
}

impl<'a> Backend<'a> {
    /// Build a backend from a single value implementing every collaborator.
    pub fn uniform<T>(all: &'a T) -> Self
    where
        T: EntitySource
            + VisibilityFilter
            + CustomFieldRegistry
            + RelationRegistry
            + FunctionFieldRegistry
            + Schema,
    {
        Self {
            entities: all,
            visibility: all,
            custom_fields: all,
            relations: all,
            functions: all,
            schema: all,
        }
    }
}
