//! # Quarry
//!
//! A report engine: turns report definitions into rows of display strings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              ReportStore (model)                         │
//! │  (definitions, columns, sub-report links by id)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [SubReportLinker: kinds + acyclicity]
//! ┌─────────────────────────────────────────────────────────┐
//! │              FetchEngine (engine)                        │
//! │  query → aggregates → resolve → expand → redact          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [Backend: collaborator traits]
//! ┌─────────────────────────────────────────────────────────┐
//! │   EntitySource, VisibilityFilter, registries (entity)    │
//! │   MemoryStore over a JSON Dataset (memory)               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use quarry::prelude::*;
//!
//! let backend = quarry::memory::fixtures::demo_store().unwrap();
//! let store = backend.reports();
//! let report = store.find("Organisations").unwrap();
//!
//! let engine = FetchEngine::new(Backend::uniform(&backend), &store);
//! let rows = engine.fetch(report, &FetchContext::unrestricted());
//! assert_eq!(rows[0], vec!["Stark", "500", "Ned"]);
//! ```

pub mod config;
pub mod engine;
pub mod entity;
pub mod memory;
pub mod model;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::engine::{
        DateRange, FetchContext, FetchEngine, Period, ReportError, ReportResult, Row,
        SubReportLinker, Table, Viewer,
    };
    pub use crate::entity::{Backend, Entity, EntityId, EntityKind, UserId, Value};
    pub use crate::model::{
        AggregateOp, AggregateSpec, Column, ColumnKind, Direction, ReportDefinition, ReportId,
        ReportStore,
    };
}
