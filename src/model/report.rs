// src/model/report.rs
use serde::{Deserialize, Serialize};

use super::{Column, FilterRef, ReportId};
use crate::engine::error::{ReportError, ReportResult};
use crate::entity::{EntityKind, UserId};

/// A report definition: ordered columns over one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDefinition {
    #[serde(default = "ReportDefinition::unassigned")]
    pub id: ReportId,
    pub name: String,
    pub entity_kind: EntityKind,
    /// Restricts the base entity set. Evaluated by the entity source.
    #[serde(default)]
    pub filter: Option<FilterRef>,
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub is_private: bool,
}

/// Direction for [`ReportDefinition::move_column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl ReportDefinition {
    pub fn new(name: impl Into<String>, entity_kind: impl Into<EntityKind>) -> Self {
        Self {
            id: Self::unassigned(),
            name: name.into(),
            entity_kind: entity_kind.into(),
            filter: None,
            columns: Vec::new(),
            owner: None,
            is_private: false,
        }
    }

    fn unassigned() -> ReportId {
        ReportId(0)
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(FilterRef::new(filter));
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, order: u32) -> Option<&Column> {
        self.columns.iter().find(|c| c.order == order)
    }

    pub(crate) fn column_mut(&mut self, order: u32) -> ReportResult<&mut Column> {
        let report = self.id;
        self.columns
            .iter_mut()
            .find(|c| c.order == order)
            .ok_or(ReportError::UnknownColumn { report, order })
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.iter_mut()
    }

    /// Append a column after the last one. Returns its order.
    pub fn add_column(&mut self, mut column: Column) -> u32 {
        let order = self.columns.last().map_or(1, |c| c.order + 1);
        column.order = order;
        self.columns.push(column);
        order
    }

    /// Remove a column and renumber the remaining ones from 1.
    pub fn remove_column(&mut self, order: u32) -> ReportResult<Column> {
        let index = self.index_of(order)?;
        let removed = self.columns.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Swap a column with its neighbour.
    pub fn move_column(&mut self, order: u32, direction: Direction) -> ReportResult<()> {
        let index = self.index_of(order)?;
        let neighbour = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|i| *i < self.columns.len()),
        }
        .ok_or(ReportError::InvalidMove {
            order,
            direction: direction.as_str(),
        })?;

        self.columns.swap(index, neighbour);
        self.renumber();
        Ok(())
    }

    /// Toggle expansion of a linked column.
    pub fn set_selected(&mut self, order: u32, selected: bool) -> ReportResult<()> {
        let column = self.column_mut(order)?;
        if column.linked_report().is_none() {
            return Err(ReportError::NotLinked {
                column: column.name.clone(),
            });
        }
        column.selected = selected;
        Ok(())
    }

    /// Sub-reports referenced by this definition's columns.
    pub fn sub_reports(&self) -> impl Iterator<Item = ReportId> + '_ {
        self.columns.iter().filter_map(Column::linked_report)
    }

    /// Restore the order invariant after deserialization: sorted by `order`,
    /// then numbered densely from 1.
    pub(crate) fn normalize(&mut self) {
        self.columns.sort_by_key(|c| c.order);
        self.renumber();
    }

    fn index_of(&self, order: u32) -> ReportResult<usize> {
        self.columns
            .iter()
            .position(|c| c.order == order)
            .ok_or(ReportError::UnknownColumn {
                report: self.id,
                order,
            })
    }

    fn renumber(&mut self) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.order = i as u32 + 1;
        }
    }
}
