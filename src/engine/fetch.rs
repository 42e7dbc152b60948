//! Fetch Engine - materializes a report definition into rows.
//!
//! A fetch runs, in order:
//! 1. base entity-set resolution through the entity source (filter + date range)
//! 2. one aggregate pass over that whole set
//! 3. a sequential resolve/expand/redact loop over the viewable entities
//!
//! Nothing is kept between fetches; concurrent fetches share only the
//! read-only store and collaborators.

use serde::Serialize;
use tracing::debug;

use super::aggregate::AggregateEvaluator;
use super::context::FetchContext;
use super::expander::{flatten_headers, Row, RowExpander, Scope};
use super::format::Formatter;
use super::resolver::ColumnResolver;
use crate::config::{FetchSettings, Settings};
use crate::entity::Backend;
use crate::model::{ReportDefinition, ReportStore};

/// Headers and rows of one fetch: the input of every export format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Plain-text rendering with columns padded to their widest cell.
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&self.headers));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

/// Entry point of the engine.
pub struct FetchEngine<'a> {
    backend: Backend<'a>,
    store: &'a ReportStore,
    settings: FetchSettings,
    formatter: Formatter,
}

impl<'a> FetchEngine<'a> {
    /// Engine with default settings.
    pub fn new(backend: Backend<'a>, store: &'a ReportStore) -> Self {
        Self::with_settings(backend, store, &Settings::default())
    }

    pub fn with_settings(backend: Backend<'a>, store: &'a ReportStore, settings: &Settings) -> Self {
        Self {
            backend,
            store,
            settings: settings.fetch.clone(),
            formatter: Formatter::new(settings.format.clone()),
        }
    }

    /// Flattened header titles, one per output slot of [`FetchEngine::fetch`] rows.
    pub fn headers(&self, report: &ReportDefinition) -> Vec<String> {
        flatten_headers(self.store, report, 0, self.settings.max_depth)
    }

    /// All rows of `report`, resolved and redacted for `context`'s viewer,
    /// in entity source order.
    pub fn fetch(&self, report: &ReportDefinition, context: &FetchContext) -> Vec<Row> {
        let base = self.backend.entities.query(
            &report.entity_kind,
            report.filter.as_ref(),
            context.date_range.as_ref(),
        );
        let aggregates = AggregateEvaluator::new(self.backend).evaluate(report, &base);

        let resolver = ColumnResolver::new(self.backend, &self.formatter, &self.settings);
        let expander = RowExpander::new(self.backend, self.store, resolver, &self.settings, context);
        expander.set_scope(report.id, Scope::new(None, aggregates));

        let mut rows = Vec::new();
        let mut hidden = 0usize;
        for entity in &base {
            if !expander.is_visible(entity) {
                hidden += 1;
                continue;
            }
            rows.extend(expander.expand(report, entity));
        }

        debug!(
            report = %report.id,
            entities = base.len(),
            hidden,
            rows = rows.len(),
            "fetched report"
        );
        rows
    }

    /// Headers and rows together.
    pub fn table(&self, report: &ReportDefinition, context: &FetchContext) -> Table {
        Table {
            headers: self.headers(report),
            rows: self.fetch(report, context),
        }
    }
}
