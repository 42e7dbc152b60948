//! Error types for report configuration and fetching.
//!
//! Only configuration-time errors reach callers as `Err`. Anything that goes
//! wrong while fetching (a failing function field, a deleted custom field)
//! degrades to a placeholder cell instead.

use crate::entity::EntityKind;
use crate::model::{ColumnKind, ReportId};

/// Result type for report configuration operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Configuration-time errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReportError {
    /// The sub-report's entity kind does not fit what the column points to.
    #[error("Report {candidate} ({candidate_kind}) cannot be linked to column '{column}': {reason}")]
    Kind {
        column: String,
        candidate: ReportId,
        candidate_kind: EntityKind,
        reason: String,
    },

    /// The column kind never takes a sub-report.
    #[error("Column '{column}' of kind {kind} cannot have a sub-report")]
    SubReportNotAllowed { column: String, kind: ColumnKind },

    /// Linking would make a report reachable from itself.
    #[error("Linking report {candidate} under report {report} creates a cycle: {}", format_cycle(.path))]
    Cycle {
        report: ReportId,
        candidate: ReportId,
        /// Report ids along the offending path, ending back at `report`.
        path: Vec<ReportId>,
    },

    #[error("Unknown report: {0}")]
    UnknownReport(ReportId),

    #[error("Report {report} has no column at position {order}")]
    UnknownColumn { report: ReportId, order: u32 },

    /// `selected` only makes sense on a linked column.
    #[error("Column '{column}' is not linked to a sub-report")]
    NotLinked { column: String },

    #[error("Column at position {order} cannot move {direction}")]
    InvalidMove { order: u32, direction: &'static str },

    /// A column references an attribute or relationship type that does not exist.
    #[error("Unknown attribute '{name}' on {kind}")]
    UnknownAttribute { kind: EntityKind, name: String },
}

fn format_cycle(path: &[ReportId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A function-field provider failed for one entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    #[error("No function field '{provider}' registered for {kind}")]
    UnknownProvider { provider: String, kind: EntityKind },

    #[error("Function field '{provider}' failed: {message}")]
    Failed { provider: String, message: String },
}
