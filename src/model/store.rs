//! Arena of report definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ReportDefinition, ReportId};
use crate::engine::error::{ReportError, ReportResult};

/// Owns every report definition; sub-report links refer into it by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ReportDefinition>", into = "Vec<ReportDefinition>")]
pub struct ReportStore {
    reports: BTreeMap<ReportId, ReportDefinition>,
    next_id: u64,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition under a fresh id and return it.
    pub fn insert(&mut self, mut report: ReportDefinition) -> ReportId {
        self.next_id += 1;
        let id = ReportId(self.next_id);
        report.id = id;
        report.normalize();
        self.reports.insert(id, report);
        id
    }

    pub fn get(&self, id: ReportId) -> Option<&ReportDefinition> {
        self.reports.get(&id)
    }

    pub fn get_mut(&mut self, id: ReportId) -> Option<&mut ReportDefinition> {
        self.reports.get_mut(&id)
    }

    pub(crate) fn require(&self, id: ReportId) -> ReportResult<&ReportDefinition> {
        self.get(id).ok_or(ReportError::UnknownReport(id))
    }

    pub(crate) fn require_mut(&mut self, id: ReportId) -> ReportResult<&mut ReportDefinition> {
        self.get_mut(id).ok_or(ReportError::UnknownReport(id))
    }

    /// Look a definition up by name.
    pub fn find(&self, name: &str) -> Option<&ReportDefinition> {
        self.reports.values().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportDefinition> {
        self.reports.values()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Delete a definition.
    ///
    /// Columns of other definitions linked to it are unlinked (and no longer
    /// selected). Returns the `(report, column order)` pairs that lost their link.
    pub fn remove(&mut self, id: ReportId) -> ReportResult<(ReportDefinition, Vec<(ReportId, u32)>)> {
        let removed = self.reports.remove(&id).ok_or(ReportError::UnknownReport(id))?;

        let mut cleared = Vec::new();
        for report in self.reports.values_mut() {
            let owner = report.id;
            for column in report.columns_mut() {
                if column.sub_report == Some(id) {
                    column.sub_report = None;
                    column.selected = false;
                    cleared.push((owner, column.order));
                }
            }
        }

        if !cleared.is_empty() {
            tracing::info!(
                report = %id,
                unlinked = cleared.len(),
                "removed report was used as a sub-report; links cleared"
            );
        }

        Ok((removed, cleared))
    }
}

impl From<Vec<ReportDefinition>> for ReportStore {
    /// Definitions that carry an id keep it; the others get fresh ones.
    fn from(reports: Vec<ReportDefinition>) -> Self {
        let mut store = ReportStore::new();
        let mut pending = Vec::new();

        for mut report in reports {
            if report.id.0 == 0 {
                pending.push(report);
                continue;
            }
            report.normalize();
            store.next_id = store.next_id.max(report.id.0);
            store.reports.insert(report.id, report);
        }

        for report in pending {
            store.insert(report);
        }
        store
    }
}

impl From<ReportStore> for Vec<ReportDefinition> {
    fn from(store: ReportStore) -> Self {
        store.reports.into_values().collect()
    }
}
