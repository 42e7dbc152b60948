// src/model/column.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AggregateSpec, ReportId};
use crate::entity::CustomFieldId;

/// How a column's `name` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Attribute of the entity, possibly a `__` path through a foreign attribute.
    RegularField,
    /// Custom attribute; `name` is the custom field id.
    CustomField,
    /// Relationship type id; resolves to the related objects.
    Relation,
    /// Named computed-value provider.
    FunctionField,
    /// Reverse relation declared by another kind (e.g. documents of a folder).
    RelatedField,
    /// Aggregate over the whole base set; `name` is an [`AggregateSpec`] key.
    Aggregate,
}

impl ColumnKind {
    /// Whether a sub-report may ever be bound to this kind of column.
    pub fn accepts_sub_report(&self) -> bool {
        matches!(
            self,
            ColumnKind::RegularField | ColumnKind::Relation | ColumnKind::RelatedField
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::RegularField => "regular_field",
            ColumnKind::CustomField => "custom_field",
            ColumnKind::Relation => "relation",
            ColumnKind::FunctionField => "function_field",
            ColumnKind::RelatedField => "related_field",
            ColumnKind::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a report definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Raw key: field path, relationship type id, custom field id,
    /// provider name or aggregate key depending on `kind`.
    pub name: String,
    pub title: String,
    /// Position, unique within the definition. Assigned by the definition.
    #[serde(default)]
    pub order: u32,
    pub kind: ColumnKind,
    /// Expand linked entities into rows instead of collapsing them into one cell.
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub sub_report: Option<ReportId>,
}

impl Column {
    pub fn new(kind: ColumnKind, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            order: 0,
            kind,
            selected: false,
            sub_report: None,
        }
    }

    pub fn regular(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::RegularField, name, title)
    }

    pub fn custom(id: CustomFieldId, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::CustomField, id.to_string(), title)
    }

    pub fn relation(relation_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::Relation, relation_type, title)
    }

    pub fn function(provider: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::FunctionField, provider, title)
    }

    pub fn related(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::RelatedField, name, title)
    }

    pub fn aggregate(spec: &AggregateSpec, title: impl Into<String>) -> Self {
        Self::new(ColumnKind::Aggregate, spec.key(), title)
    }

    /// Sub-report this column is linked to, if its kind allows one.
    ///
    /// Regular fields only take a sub-report on the foreign attribute itself,
    /// not on a path through it.
    pub fn linked_report(&self) -> Option<ReportId> {
        match self.kind {
            ColumnKind::RegularField if !self.field_path().is_simple() => None,
            kind if kind.accepts_sub_report() => self.sub_report,
            _ => None,
        }
    }

    /// Linked and expanding into rows.
    pub fn is_expanding(&self) -> bool {
        self.selected && self.linked_report().is_some()
    }

    pub fn field_path(&self) -> FieldPath {
        FieldPath::parse(&self.name)
    }

    pub fn custom_field_id(&self) -> Option<CustomFieldId> {
        self.name.trim().parse().ok().map(CustomFieldId)
    }

    pub fn aggregate_spec(&self) -> Option<AggregateSpec> {
        self.name.parse().ok()
    }
}

/// A regular-field name split on `__`.
///
/// `employer__name` reads the `name` attribute of the entity referenced by
/// `employer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(name: &str) -> Self {
        Self {
            segments: name
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// First attribute, on the base entity.
    pub fn head(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Remaining path on the linked entity.
    pub fn tail(&self) -> &[String] {
        self.segments.get(1..).unwrap_or(&[])
    }

    pub fn is_simple(&self) -> bool {
        self.segments.len() <= 1
    }
}
