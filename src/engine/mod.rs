//! The fetch engine.
//!
//! ```text
//! ReportDefinition ──► EntitySource::query ──► AggregateEvaluator (once)
//!                                   │
//!                                   ▼
//!                for each viewable entity: ColumnResolver per column
//!                                   │
//!                                   ▼
//!              RowExpander (expand / collapse / redact, recursive)
//!                                   │
//!                                   ▼
//!                              Vec<Row>
//! ```
//!
//! [`SubReportLinker`] guards the other side: it only lets links into the
//! [`ReportStore`](crate::model::ReportStore) that keep the report graph
//! acyclic and kind-compatible.

pub mod aggregate;
pub mod context;
pub mod error;
pub mod expander;
pub mod fetch;
pub mod format;
pub mod linker;
pub mod resolver;

pub use aggregate::{AggregateEvaluator, AggregateValues};
pub use context::{DateRange, FetchContext, Period, Viewer};
pub use error::{ComputationError, ReportError, ReportResult};
pub use expander::{flatten_headers, Row, RowExpander};
pub use fetch::{FetchEngine, Table};
pub use format::{collapse_pairs, Formatter, ENTITY_SEPARATOR, FIELD_SEPARATOR};
pub use linker::{check_cycle, ReportGraph, SubReportLinker};
pub use resolver::{ColumnResolver, RelatedSet, ResolvedValue};
