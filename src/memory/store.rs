//! [`MemoryStore`]: every collaborator trait over one [`Dataset`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::warn;

use super::dataset::{Dataset, DatasetError, EntityFilter, User};
use crate::engine::context::DateRange;
use crate::engine::error::ComputationError;
use crate::entity::{
    CustomFieldDef, CustomFieldId, CustomFieldRegistry, Entity, EntityId, EntityKind,
    EntitySource, FieldDef, FunctionFieldRegistry, RelatedFieldDef, RelationRegistry,
    RelationType, Schema, UserId, Value, VisibilityFilter,
};
use crate::model::{FilterRef, ReportStore};

/// Provider of a function field: display text, or a failure message.
pub type FunctionFn = Box<dyn Fn(&Entity) -> Result<String, String> + Send + Sync>;

/// Name of the function field registered for every kind.
pub const LABEL_FUNCTION: &str = "label";

/// In-memory implementation of the engine's collaborators.
pub struct MemoryStore {
    dataset: Dataset,
    index: HashMap<EntityId, usize>,
    functions: HashMap<(EntityKind, String), FunctionFn>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entities", &self.dataset.entities.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

impl MemoryStore {
    /// Validate and index a dataset.
    pub fn new(dataset: Dataset) -> Result<Self, DatasetError> {
        dataset.validate()?;

        let index = dataset
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();

        let mut store = Self {
            dataset,
            index,
            functions: HashMap::new(),
        };

        let kinds: BTreeSet<EntityKind> = store
            .dataset
            .schema
            .keys()
            .cloned()
            .chain(store.dataset.entities.iter().map(|e| e.kind.clone()))
            .collect();
        for kind in kinds {
            store.register_function(kind, LABEL_FUNCTION, |e| Ok(e.label.clone()));
        }
        Ok(store)
    }

    /// Register (or replace) the provider `name` for entities of `kind`.
    pub fn register_function<F>(&mut self, kind: impl Into<EntityKind>, name: &str, provider: F)
    where
        F: Fn(&Entity) -> Result<String, String> + Send + Sync + 'static,
    {
        self.functions
            .insert((kind.into(), name.to_string()), Box::new(provider));
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// A fresh report store holding the dataset's stored definitions.
    pub fn reports(&self) -> ReportStore {
        ReportStore::from(self.dataset.reports.clone())
    }

    fn user(&self, id: &UserId) -> Option<&User> {
        self.dataset.users.iter().find(|u| &u.id == id)
    }

    fn filter(&self, id: &FilterRef) -> Option<&EntityFilter> {
        self.dataset.filters.iter().find(|f| f.id == id.as_str())
    }

    fn kind_schema(&self, kind: &EntityKind) -> Option<&super::dataset::KindSchema> {
        self.dataset.schema.get(kind)
    }
}

impl EntitySource for MemoryStore {
    fn query(
        &self,
        kind: &EntityKind,
        filter: Option<&FilterRef>,
        date_range: Option<&DateRange>,
    ) -> Vec<Entity> {
        let filter = match filter {
            Some(id) => match self.filter(id) {
                Some(f) if f.applies_to(kind) => Some(f),
                Some(f) => {
                    warn!(
                        filter = %id.as_str(),
                        filter_kind = ?f.kind,
                        kind = %kind,
                        "filter is for another kind; no entity matches"
                    );
                    return Vec::new();
                }
                None => {
                    warn!(filter = %id.as_str(), "unknown filter; no entity matches");
                    return Vec::new();
                }
            },
            None => None,
        };

        self.dataset
            .entities
            .iter()
            .filter(|e| &e.kind == kind)
            .filter(|e| filter.map_or(true, |f| f.accepts(e)))
            .filter(|e| date_range.map_or(true, |r| r.matches(e)))
            .cloned()
            .collect()
    }

    fn get(&self, id: EntityId) -> Option<Entity> {
        self.index
            .get(&id)
            .and_then(|&i| self.dataset.entities.get(i))
            .cloned()
    }

    fn referencing(&self, kind: &EntityKind, field: &str, target: EntityId) -> Vec<Entity> {
        self.dataset
            .entities
            .iter()
            .filter(|e| &e.kind == kind && e.field(field).refs().contains(&target))
            .cloned()
            .collect()
    }
}

impl VisibilityFilter for MemoryStore {
    fn is_viewable(&self, entity: &Entity, user: &UserId) -> bool {
        let Some(account) = self.user(user) else {
            return false;
        };
        account.superuser
            || entity.owner.as_ref() == Some(user)
            || account.viewable_kinds.contains(&entity.kind)
    }
}

impl CustomFieldRegistry for MemoryStore {
    fn field(&self, id: CustomFieldId) -> Option<CustomFieldDef> {
        self.dataset
            .custom_fields
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    fn value(&self, entity: &Entity, id: CustomFieldId) -> Option<Value> {
        self.dataset
            .custom_values
            .iter()
            .find(|v| v.entity == entity.id && v.field == id)
            .map(|v| v.value.clone())
    }
}

impl RelationRegistry for MemoryStore {
    fn relation_type(&self, id: &str) -> Option<RelationType> {
        self.dataset
            .relation_types
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    fn related_entities(&self, entity: &Entity, relation_type: &str) -> Vec<Entity> {
        self.dataset
            .relations
            .iter()
            .filter(|r| r.subject == entity.id && r.relation_type == relation_type)
            .filter_map(|r| self.get(r.object))
            .collect()
    }
}

impl FunctionFieldRegistry for MemoryStore {
    fn compute(&self, provider: &str, entity: &Entity) -> Result<String, ComputationError> {
        let f = self
            .functions
            .get(&(entity.kind.clone(), provider.to_string()))
            .ok_or_else(|| ComputationError::UnknownProvider {
                provider: provider.to_string(),
                kind: entity.kind.clone(),
            })?;
        f(entity).map_err(|message| ComputationError::Failed {
            provider: provider.to_string(),
            message,
        })
    }
}

impl Schema for MemoryStore {
    fn field(&self, kind: &EntityKind, name: &str) -> Option<FieldDef> {
        self.kind_schema(kind)?
            .fields
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }

    fn related_field(&self, kind: &EntityKind, name: &str) -> Option<RelatedFieldDef> {
        self.kind_schema(kind)?
            .related
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }
}
