//! Sub-Report Linker - binds columns to nested report definitions.
//!
//! A link is only stored when the candidate's entity kind fits what the
//! column points to and when it keeps the report graph acyclic. Failed links
//! leave every definition untouched.

use std::collections::HashMap;

use petgraph::algo::{astar, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};

use super::error::{ReportError, ReportResult};
use crate::entity::{RelationRegistry, Schema};
use crate::model::{Column, ColumnKind, ReportDefinition, ReportId, ReportStore};

// ============================================================================
// Report graph
// ============================================================================

/// Directed graph of sub-report links: an edge `A -> B` means a column of
/// report `A` is linked to report `B`.
#[derive(Debug, Default)]
pub struct ReportGraph {
    graph: DiGraph<ReportId, u32>,
    nodes: HashMap<ReportId, NodeIndex>,
}

impl ReportGraph {
    /// Build the graph of every link in the store.
    pub fn from_store(store: &ReportStore) -> Self {
        let mut graph = Self::default();
        for report in store.iter() {
            graph.node(report.id);
            for column in report.columns() {
                if let Some(target) = column.linked_report() {
                    graph.add_link(report.id, target, column.order);
                }
            }
        }
        graph
    }

    fn node(&mut self, id: ReportId) -> NodeIndex {
        *self
            .nodes
            .entry(id)
            .or_insert_with(|| self.graph.add_node(id))
    }

    pub fn add_link(&mut self, from: ReportId, to: ReportId, order: u32) {
        let from = self.node(from);
        let to = self.node(to);
        self.graph.add_edge(from, to, order);
    }

    /// A shortest chain of links leading from `from` to `to`, both included.
    pub fn path(&self, from: ReportId, to: ReportId) -> Option<Vec<ReportId>> {
        let start = *self.nodes.get(&from)?;
        let goal = *self.nodes.get(&to)?;
        let (_, nodes) = astar(&self.graph, start, |n| n == goal, |_| 1u32, |_| 0)?;
        Some(nodes.into_iter().map(|n| self.graph[n]).collect())
    }

    /// Every cycle in the graph, one per strongly connected component.
    ///
    /// A single report is only a cycle when it links to itself.
    pub fn detect_cycles(&self) -> Vec<Vec<ReportId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.edges_connecting(scc[0], scc[0]).next().is_some()
            })
            .map(|scc| {
                let mut ids: Vec<ReportId> = scc.into_iter().map(|n| self.graph[n]).collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Reports directly linked from `from`.
    pub fn links_from(&self, from: ReportId) -> impl Iterator<Item = ReportId> + '_ {
        self.nodes
            .get(&from)
            .into_iter()
            .flat_map(move |&n| self.graph.neighbors(n))
            .map(move |n| self.graph[n])
    }

    /// One [`ReportError::Cycle`] per cycle, naming a real link of the
    /// cycle and the chain of links that leads back to its owner.
    pub fn cycle_errors(&self) -> Vec<ReportError> {
        self.detect_cycles()
            .into_iter()
            .map(|cycle| {
                let report = cycle[0];
                let candidate = self
                    .links_from(report)
                    .filter(|id| cycle.contains(id))
                    .min()
                    .unwrap_or(report);
                let path = if candidate == report {
                    vec![report]
                } else {
                    self.path(candidate, report)
                        .unwrap_or_else(|| vec![candidate, report])
                };
                ReportError::Cycle {
                    report,
                    candidate,
                    path,
                }
            })
            .collect()
    }
}

// ============================================================================
// Linker
// ============================================================================

/// Validates and stores column → sub-report links.
pub struct SubReportLinker<'a> {
    schema: &'a dyn Schema,
    relations: &'a dyn RelationRegistry,
}

impl<'a> SubReportLinker<'a> {
    pub fn new(schema: &'a dyn Schema, relations: &'a dyn RelationRegistry) -> Self {
        Self { schema, relations }
    }

    /// Link column `order` of `report` to `candidate`.
    pub fn link(
        &self,
        store: &mut ReportStore,
        report: ReportId,
        order: u32,
        candidate: ReportId,
    ) -> ReportResult<()> {
        let owner = store.require(report)?;
        let column = owner
            .column(order)
            .ok_or(ReportError::UnknownColumn { report, order })?;
        let target = store.require(candidate)?;

        self.check_kind(owner, column, target)?;
        check_cycle(store, report, candidate)?;

        let column = store.require_mut(report)?.column_mut(order)?;
        column.sub_report = Some(candidate);
        tracing::debug!(report = %report, column = order, sub_report = %candidate, "linked sub-report");
        Ok(())
    }

    /// Remove the link of column `order`; the column stops being selected.
    pub fn unlink(&self, store: &mut ReportStore, report: ReportId, order: u32) -> ReportResult<()> {
        let column = store.require_mut(report)?.column_mut(order)?;
        column.sub_report = None;
        column.selected = false;
        Ok(())
    }

    /// Check that `candidate`'s entity kind is what `column` points to.
    pub fn check_kind(
        &self,
        owner: &ReportDefinition,
        column: &Column,
        candidate: &ReportDefinition,
    ) -> ReportResult<()> {
        let kind_error = |reason: String| ReportError::Kind {
            column: column.name.clone(),
            candidate: candidate.id,
            candidate_kind: candidate.entity_kind.clone(),
            reason,
        };
        let unknown = || ReportError::UnknownAttribute {
            kind: owner.entity_kind.clone(),
            name: column.name.clone(),
        };

        match column.kind {
            ColumnKind::RegularField => {
                let path = column.field_path();
                if !path.is_simple() {
                    return Err(kind_error(
                        "a sub-report replaces the attribute path; link the foreign attribute itself"
                            .to_string(),
                    ));
                }
                let def = self
                    .schema
                    .field(&owner.entity_kind, path.head())
                    .ok_or_else(unknown)?;
                match def.field_type.target() {
                    None => Err(kind_error(format!("'{}' does not point to an entity", def.name))),
                    Some(target) if *target == candidate.entity_kind => Ok(()),
                    Some(target) => Err(kind_error(format!("expected a report on {}", target))),
                }
            }
            ColumnKind::Relation => {
                let rtype = self.relations.relation_type(&column.name).ok_or_else(unknown)?;
                if rtype.accepts(&candidate.entity_kind) {
                    Ok(())
                } else {
                    Err(kind_error(format!(
                        "relationship '{}' does not accept {} objects",
                        rtype.label, candidate.entity_kind
                    )))
                }
            }
            ColumnKind::RelatedField => {
                let def = self
                    .schema
                    .related_field(&owner.entity_kind, &column.name)
                    .ok_or_else(unknown)?;
                if def.target == candidate.entity_kind {
                    Ok(())
                } else {
                    Err(kind_error(format!("expected a report on {}", def.target)))
                }
            }
            ColumnKind::CustomField | ColumnKind::FunctionField | ColumnKind::Aggregate => {
                Err(ReportError::SubReportNotAllowed {
                    column: column.name.clone(),
                    kind: column.kind,
                })
            }
        }
    }

    /// Check every stored link: targets exist, kinds fit, no cycles.
    ///
    /// Meant for definitions that did not go through [`SubReportLinker::link`],
    /// e.g. loaded from a file. Collects all errors instead of stopping.
    pub fn validate(&self, store: &ReportStore) -> Result<(), Vec<ReportError>> {
        let mut errors = Vec::new();

        for report in store.iter() {
            for column in report.columns() {
                let Some(target) = column.sub_report else {
                    continue;
                };
                if !column.kind.accepts_sub_report() {
                    errors.push(ReportError::SubReportNotAllowed {
                        column: column.name.clone(),
                        kind: column.kind,
                    });
                    continue;
                }
                match store.get(target) {
                    Some(candidate) => {
                        if let Err(e) = self.check_kind(report, column, candidate) {
                            errors.push(e);
                        }
                    }
                    None => errors.push(ReportError::UnknownReport(target)),
                }
            }
        }

        errors.extend(ReportGraph::from_store(store).cycle_errors());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Fail if linking `candidate` under `report` would let `report` reach itself.
pub fn check_cycle(store: &ReportStore, report: ReportId, candidate: ReportId) -> ReportResult<()> {
    if candidate == report {
        return Err(ReportError::Cycle {
            report,
            candidate,
            path: vec![report],
        });
    }

    match ReportGraph::from_store(store).path(candidate, report) {
        Some(path) => Err(ReportError::Cycle {
            report,
            candidate,
            path,
        }),
        None => Ok(()),
    }
}

impl ReportStore {
    /// Check every stored link. See [`SubReportLinker::validate`].
    pub fn validate(
        &self,
        schema: &dyn Schema,
        relations: &dyn RelationRegistry,
    ) -> Result<(), Vec<ReportError>> {
        SubReportLinker::new(schema, relations).validate(self)
    }
}
