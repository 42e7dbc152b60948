//! Report definitions.
//!
//! A [`ReportDefinition`] is an ordered list of [`Column`]s over one entity
//! kind. Columns may be bound to another definition (a sub-report) by id;
//! definitions live in a [`ReportStore`] arena so links never own their
//! targets.

pub mod aggregate;
pub mod column;
pub mod report;
pub mod store;

pub use aggregate::{AggregateOp, AggregateSpec, AggregateTarget};
pub use column::{Column, ColumnKind, FieldPath};
pub use report::{Direction, ReportDefinition};
pub use store::ReportStore;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a report definition inside a [`ReportStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle of an entity filter, evaluated by the entity source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterRef(pub String);

impl FilterRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
