//! Row Expander - turns one entity into one or more output rows.
//!
//! Every column of a definition becomes a *slot*: a list of alternative cell
//! runs. Scalar slots have exactly one alternative of one cell. An expanding
//! slot (a selected, linked column) has one alternative per row produced by
//! its sub-report for each visible target, or a single run of empty cells
//! when there is none. Output rows are the cross product of all slots in
//! column order, so with one expanding slot the scalar cells are repeated
//! on every line.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::warn;

use super::aggregate::{AggregateEvaluator, AggregateValues};
use super::context::{FetchContext, Viewer};
use super::format::{collapse_pairs, ENTITY_SEPARATOR};
use super::resolver::{ColumnResolver, RelatedSet, ResolvedValue};
use crate::config::FetchSettings;
use crate::entity::{Backend, Entity, EntityId};
use crate::model::{Column, ColumnKind, ReportDefinition, ReportId, ReportStore};

/// One output row: display strings, one per flattened header.
pub type Row = Vec<String>;

/// Alternative cell runs of one column.
type Slot = Vec<Vec<String>>;

/// Per-definition data computed once per fetch.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    /// Members of the definition's filtered base set, when it has a filter.
    members: Option<HashSet<EntityId>>,
    aggregates: AggregateValues,
}

impl Scope {
    pub(crate) fn new(members: Option<HashSet<EntityId>>, aggregates: AggregateValues) -> Self {
        Self {
            members,
            aggregates,
        }
    }

    fn admits(&self, entity: &Entity) -> bool {
        self.members
            .as_ref()
            .map_or(true, |members| members.contains(&entity.id))
    }
}

/// Flattened header titles of `report`, as nested at `depth`.
///
/// A selected sub-report column contributes its sub-report's own headers;
/// every other column contributes its title.
pub fn flatten_headers(
    store: &ReportStore,
    report: &ReportDefinition,
    depth: usize,
    max_depth: usize,
) -> Vec<String> {
    report
        .columns()
        .iter()
        .flat_map(|column| match expansion_target(store, column, depth, max_depth) {
            Some(sub) => flatten_headers(store, sub, depth + 1, max_depth),
            None => vec![column.title.clone()],
        })
        .collect()
}

/// The sub-report a column expands into at `depth`, if it expands at all.
fn expansion_target<'s>(
    store: &'s ReportStore,
    column: &Column,
    depth: usize,
    max_depth: usize,
) -> Option<&'s ReportDefinition> {
    if !column.is_expanding() {
        return None;
    }
    nested_report(store, column, depth, max_depth)
}

/// The linked sub-report, if it exists and nesting stays within bounds.
fn nested_report<'s>(
    store: &'s ReportStore,
    column: &Column,
    depth: usize,
    max_depth: usize,
) -> Option<&'s ReportDefinition> {
    let id = column.linked_report()?;
    if depth + 1 > max_depth {
        return None;
    }
    store.get(id)
}

/// Expands entities of one fetch into rows.
///
/// Holds the per-fetch scope cache; create one per fetch and drop it after.
pub struct RowExpander<'a> {
    backend: Backend<'a>,
    store: &'a ReportStore,
    resolver: ColumnResolver<'a>,
    settings: &'a FetchSettings,
    context: &'a FetchContext,
    scopes: RefCell<HashMap<ReportId, Rc<Scope>>>,
}

impl<'a> RowExpander<'a> {
    pub fn new(
        backend: Backend<'a>,
        store: &'a ReportStore,
        resolver: ColumnResolver<'a>,
        settings: &'a FetchSettings,
        context: &'a FetchContext,
    ) -> Self {
        Self {
            backend,
            store,
            resolver,
            settings,
            context,
            scopes: RefCell::new(HashMap::new()),
        }
    }

    /// Seed the scope of a definition whose base set is already known.
    pub(crate) fn set_scope(&self, report: ReportId, scope: Scope) {
        self.scopes.borrow_mut().insert(report, Rc::new(scope));
    }

    /// Whether the acting viewer may see `entity`.
    pub fn is_visible(&self, entity: &Entity) -> bool {
        match &self.context.viewer {
            Viewer::Unrestricted => true,
            Viewer::User(user) => self.backend.visibility.is_viewable(entity, user),
        }
    }

    /// Rows of `report` for a top-level `entity`.
    pub fn expand(&self, report: &ReportDefinition, entity: &Entity) -> Vec<Row> {
        self.expand_at(report, entity, 0)
    }

    fn expand_at(&self, report: &ReportDefinition, entity: &Entity, depth: usize) -> Vec<Row> {
        let scope = self.scope(report);

        let slots: Vec<Slot> = report
            .columns()
            .iter()
            .map(|column| {
                let value = self.resolver.resolve(column, entity, &scope.aggregates);
                self.slot(column, value, depth)
            })
            .collect();

        cross_product(slots)
    }

    fn slot(&self, column: &Column, value: ResolvedValue, depth: usize) -> Slot {
        let max_depth = self.settings.max_depth;

        if let Some(sub) = expansion_target(self.store, column, depth, max_depth) {
            let targets = match value {
                ResolvedValue::Related(set) => set.entities,
                ResolvedValue::Linked { entity, .. } => vec![entity],
                ResolvedValue::Text(_) => Vec::new(),
            };
            return self.expanded_slot(sub, targets, depth);
        }

        let text = match value {
            ResolvedValue::Text(text) => text,
            ResolvedValue::Linked { entity, text } => {
                if self.is_visible(&entity) {
                    text
                } else {
                    self.settings.hidden_placeholder.clone()
                }
            }
            ResolvedValue::Related(set) => self.collapsed_text(column, set, depth),
        };
        vec![vec![text]]
    }

    fn expanded_slot(&self, sub: &ReportDefinition, targets: Vec<Entity>, depth: usize) -> Slot {
        let scope = self.scope(sub);
        let rows: Slot = targets
            .iter()
            .filter(|e| self.is_visible(e) && scope.admits(e))
            .flat_map(|e| self.expand_at(sub, e, depth + 1))
            .collect();

        if rows.is_empty() {
            let width = flatten_headers(self.store, sub, depth + 1, self.settings.max_depth).len();
            return vec![vec![String::new(); width]];
        }
        rows
    }

    fn collapsed_text(&self, column: &Column, set: RelatedSet, depth: usize) -> String {
        if set.single {
            if let Some(target) = set.entities.first() {
                if !self.is_visible(target) {
                    return self.settings.hidden_placeholder.clone();
                }
            }
        }

        let sub = set
            .sub_report
            .and_then(|_| self.linked_sub_report(column, depth));

        let visible = set.entities.iter().filter(|e| self.is_visible(e));
        let parts: Vec<String> = match sub {
            Some(sub) => {
                let scope = self.scope(sub);
                let titles = flatten_headers(self.store, sub, depth + 1, self.settings.max_depth);
                visible
                    .filter(|e| scope.admits(e))
                    .flat_map(|e| self.expand_at(sub, e, depth + 1))
                    .map(|row| {
                        collapse_pairs(titles.iter().map(String::as_str).zip(row.iter().map(String::as_str)))
                    })
                    .collect()
            }
            None => visible
                .map(|e| self.resolver.render_path(e, &set.path))
                .filter(|s| !s.is_empty())
                .collect(),
        };

        parts.join(ENTITY_SEPARATOR)
    }

    /// The linked sub-report of a collapsed column, logging dangling links
    /// and nesting beyond the configured depth.
    fn linked_sub_report(&self, column: &Column, depth: usize) -> Option<&'a ReportDefinition> {
        let id = column.linked_report()?;
        let sub = nested_report(self.store, column, depth, self.settings.max_depth);
        if sub.is_none() {
            if self.store.get(id).is_none() {
                warn!(column = %column.name, sub_report = %id, "column linked to a missing report");
            } else {
                warn!(
                    column = %column.name,
                    sub_report = %id,
                    max_depth = self.settings.max_depth,
                    "sub-report nesting too deep; rendering targets unlinked"
                );
            }
        }
        sub
    }

    /// Scope of a definition, computed on first use within this fetch.
    fn scope(&self, report: &ReportDefinition) -> Rc<Scope> {
        if let Some(scope) = self.scopes.borrow().get(&report.id) {
            return Rc::clone(scope);
        }

        let has_aggregates = report
            .columns()
            .iter()
            .any(|c| c.kind == ColumnKind::Aggregate);

        let scope = if report.filter.is_none() && !has_aggregates {
            Scope::default()
        } else {
            let base = self
                .backend
                .entities
                .query(&report.entity_kind, report.filter.as_ref(), None);
            let aggregates = AggregateEvaluator::new(self.backend).evaluate(report, &base);
            let members = report
                .filter
                .as_ref()
                .map(|_| base.iter().map(|e| e.id).collect());
            Scope::new(members, aggregates)
        };

        let scope = Rc::new(scope);
        self.scopes
            .borrow_mut()
            .insert(report.id, Rc::clone(&scope));
        scope
    }
}

/// Ordered cross product of slots: earlier columns vary slowest.
fn cross_product(slots: Vec<Slot>) -> Vec<Row> {
    let mut rows: Vec<Row> = vec![Vec::new()];
    for slot in slots {
        if slot.len() == 1 {
            let run = &slot[0];
            for row in &mut rows {
                row.extend(run.iter().cloned());
            }
            continue;
        }

        rows = rows
            .iter()
            .flat_map(|row| {
                slot.iter().map(move |run| {
                    let mut next = row.clone();
                    next.extend(run.iter().cloned());
                    next
                })
            })
            .collect();
    }
    rows
}
