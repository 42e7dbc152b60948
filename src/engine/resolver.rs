//! Column Resolver - extracts one column's value from one entity.
//!
//! Each [`ColumnKind`] has its own resolution function. Scalar columns
//! resolve straight to display text; columns pointing at other entities
//! resolve to the entities themselves so that the row expander can decide
//! between expanding, collapsing and redacting.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::aggregate::AggregateValues;
use super::format::{Formatter, ENTITY_SEPARATOR};
use crate::config::FetchSettings;
use crate::entity::{Backend, Entity, FieldType, Value};
use crate::model::{Column, ColumnKind, ReportId};

/// A column's value for one entity, before expansion and redaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Final display text.
    Text(String),
    /// Text read through a single linked entity. Redacted when the viewer
    /// cannot see `entity`.
    Linked { entity: Entity, text: String },
    /// A collection of target entities.
    Related(RelatedSet),
}

impl ResolvedValue {
    pub fn empty() -> Self {
        ResolvedValue::Text(String::new())
    }
}

/// Target entities of a relationship, reverse relation or foreign attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedSet {
    /// Distinct targets, in collaborator order.
    pub entities: Vec<Entity>,
    /// Sub-report deciding which target columns are surfaced.
    pub sub_report: Option<ReportId>,
    /// The set comes from a single foreign attribute (at most one entity).
    pub single: bool,
    /// Attribute path rendered on each target when no sub-report is bound.
    /// Empty means the target's default representation.
    pub path: Vec<String>,
}

impl RelatedSet {
    fn collection(entities: Vec<Entity>, sub_report: Option<ReportId>) -> Self {
        Self {
            entities: dedup(entities),
            sub_report,
            single: false,
            path: Vec::new(),
        }
    }
}

/// Resolves columns against entities through the backend collaborators.
pub struct ColumnResolver<'a> {
    backend: Backend<'a>,
    formatter: &'a Formatter,
    settings: &'a FetchSettings,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(backend: Backend<'a>, formatter: &'a Formatter, settings: &'a FetchSettings) -> Self {
        Self {
            backend,
            formatter,
            settings,
        }
    }

    /// Resolve `column` for `entity`. Aggregate columns read from `aggregates`,
    /// computed once for the whole definition.
    pub fn resolve(
        &self,
        column: &Column,
        entity: &Entity,
        aggregates: &AggregateValues,
    ) -> ResolvedValue {
        match column.kind {
            ColumnKind::RegularField => self.regular_field(column, entity),
            ColumnKind::CustomField => self.custom_field(column, entity),
            ColumnKind::Relation => self.relation(column, entity),
            ColumnKind::FunctionField => self.function_field(column, entity),
            ColumnKind::RelatedField => self.related_field(column, entity),
            ColumnKind::Aggregate => aggregates
                .get(&column.name)
                .map(|v| ResolvedValue::Text(self.formatter.number(v)))
                .unwrap_or_else(ResolvedValue::empty),
        }
    }

    /// Render an attribute path on an entity; an empty path is its label.
    pub fn render_path(&self, entity: &Entity, path: &[String]) -> String {
        let Some((head, tail)) = path.split_first() else {
            return entity.label.clone();
        };

        let value = entity.field(head);
        let refs = value.refs();
        if refs.is_empty() {
            if !tail.is_empty() {
                debug!(kind = %entity.kind, field = %head, "path continues past a scalar attribute");
                return String::new();
            }
            return self.formatter.value(value);
        }

        refs.into_iter()
            .filter_map(|id| self.backend.entities.get(id))
            .map(|target| self.render_path(&target, tail))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(ENTITY_SEPARATOR)
    }

    // =========================================================================
    // Per-kind resolution
    // =========================================================================

    fn regular_field(&self, column: &Column, entity: &Entity) -> ResolvedValue {
        let path = column.field_path();
        let head = path.head();
        let value = entity.field(head);
        let field_type = self
            .backend
            .schema
            .field(&entity.kind, head)
            .map(|def| def.field_type);

        let is_link = matches!(
            field_type,
            Some(FieldType::ForeignKey { .. } | FieldType::ManyToMany { .. })
        ) || matches!(value, Value::Ref(_))
            || (matches!(value, Value::List(_)) && !value.refs().is_empty());

        if !is_link {
            if !path.tail().is_empty() {
                debug!(kind = %entity.kind, column = %column.name, "unknown foreign attribute");
                return ResolvedValue::empty();
            }
            return ResolvedValue::Text(self.formatter.value(value));
        }

        let single = match field_type {
            Some(FieldType::ManyToMany { .. }) => false,
            Some(_) => true,
            None => matches!(value, Value::Ref(_)),
        };
        let targets: Vec<Entity> = value
            .refs()
            .into_iter()
            .filter_map(|id| self.backend.entities.get(id))
            .collect();

        let sub_report = column.linked_report();
        if sub_report.is_none() && single {
            return match targets.into_iter().next() {
                Some(target) => {
                    let text = self.render_path(&target, path.tail());
                    ResolvedValue::Linked {
                        entity: target,
                        text,
                    }
                }
                None => ResolvedValue::empty(),
            };
        }

        ResolvedValue::Related(RelatedSet {
            entities: dedup(targets),
            sub_report,
            single,
            path: path.tail().to_vec(),
        })
    }

    fn custom_field(&self, column: &Column, entity: &Entity) -> ResolvedValue {
        let Some(id) = column.custom_field_id() else {
            warn!(column = %column.name, "custom field column has a malformed id");
            return ResolvedValue::empty();
        };
        if self.backend.custom_fields.field(id).is_none() {
            debug!(custom_field = %id, "unknown custom field");
            return ResolvedValue::empty();
        }

        let text = self
            .backend
            .custom_fields
            .value(entity, id)
            .map(|v| self.formatter.value(&v))
            .unwrap_or_default();
        ResolvedValue::Text(text)
    }

    fn relation(&self, column: &Column, entity: &Entity) -> ResolvedValue {
        if self.backend.relations.relation_type(&column.name).is_none() {
            debug!(relation_type = %column.name, "unknown relationship type");
            return ResolvedValue::empty();
        }

        let related = self.backend.relations.related_entities(entity, &column.name);
        ResolvedValue::Related(RelatedSet::collection(related, column.linked_report()))
    }

    fn function_field(&self, column: &Column, entity: &Entity) -> ResolvedValue {
        match self.backend.functions.compute(&column.name, entity) {
            Ok(text) => ResolvedValue::Text(text),
            Err(err) => {
                warn!(entity = %entity.id, error = %err, "function field failed");
                ResolvedValue::Text(self.settings.function_error.clone())
            }
        }
    }

    fn related_field(&self, column: &Column, entity: &Entity) -> ResolvedValue {
        let Some(def) = self.backend.schema.related_field(&entity.kind, &column.name) else {
            debug!(kind = %entity.kind, related = %column.name, "unknown related field");
            return ResolvedValue::empty();
        };

        let related = self
            .backend
            .entities
            .referencing(&def.target, &def.reverse_field, entity.id);
        ResolvedValue::Related(RelatedSet::collection(related, column.linked_report()))
    }
}

/// Keep the first occurrence of each entity.
fn dedup(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = HashSet::new();
    entities.into_iter().filter(|e| seen.insert(e.id)).collect()
}
