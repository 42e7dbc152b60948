//! Aggregate Evaluator - SUM/MIN/MAX/AVG over a report's whole base set.
//!
//! Values are computed once per definition and fetch, then read by every
//! row of that definition, so an aggregate cell never varies with the
//! expansion of other columns.

use std::collections::BTreeMap;

use tracing::debug;

use crate::entity::{Backend, Entity};
use crate::model::{AggregateOp, AggregateSpec, AggregateTarget, ColumnKind, ReportDefinition};

/// Aggregate results keyed by aggregate column key (e.g. `capital__min`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateValues {
    values: BTreeMap<String, f64>,
}

impl AggregateValues {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Computes the aggregate columns of a definition.
pub struct AggregateEvaluator<'a> {
    backend: Backend<'a>,
}

impl<'a> AggregateEvaluator<'a> {
    pub fn new(backend: Backend<'a>) -> Self {
        Self { backend }
    }

    /// Evaluate every aggregate column of `report` over `entities`.
    ///
    /// Columns whose key does not parse, or whose attribute is unknown or not
    /// numeric, get no value and render as an empty cell.
    pub fn evaluate(&self, report: &ReportDefinition, entities: &[Entity]) -> AggregateValues {
        let mut values = BTreeMap::new();

        for column in report
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Aggregate)
        {
            let Some(spec) = column.aggregate_spec() else {
                debug!(report = %report.id, key = %column.name, "malformed aggregate key");
                continue;
            };
            if values.contains_key(&column.name) {
                continue;
            }
            if let Some(value) = self.compute(report, &spec, entities) {
                values.insert(column.name.clone(), value);
            }
        }

        AggregateValues { values }
    }

    fn compute(
        &self,
        report: &ReportDefinition,
        spec: &AggregateSpec,
        entities: &[Entity],
    ) -> Option<f64> {
        let samples: Vec<Option<f64>> = match &spec.target {
            AggregateTarget::Field(name) => {
                let def = self.backend.schema.field(&report.entity_kind, name);
                if !def.is_some_and(|d| d.field_type.is_numeric()) {
                    debug!(kind = %report.entity_kind, field = %name, "aggregate over a non-numeric field");
                    return None;
                }
                entities.iter().map(|e| e.field(name).as_f64()).collect()
            }
            AggregateTarget::CustomField(id) => {
                let def = self.backend.custom_fields.field(*id)?;
                if !def.value_type.is_numeric() {
                    debug!(custom_field = %id, "aggregate over a non-numeric custom field");
                    return None;
                }
                entities
                    .iter()
                    .map(|e| {
                        self.backend
                            .custom_fields
                            .value(e, *id)
                            .and_then(|v| v.as_f64())
                    })
                    .collect()
            }
        };

        Some(apply(spec.op, &samples))
    }
}

/// Apply an operator. Missing values count as 0 for SUM and AVG and are
/// skipped by MIN and MAX; no values at all gives 0.
pub fn apply(op: AggregateOp, samples: &[Option<f64>]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    match op {
        AggregateOp::Sum => samples.iter().map(|v| v.unwrap_or(0.0)).sum(),
        AggregateOp::Avg => {
            let total: f64 = samples.iter().map(|v| v.unwrap_or(0.0)).sum();
            total / samples.len() as f64
        }
        AggregateOp::Min => samples.iter().flatten().copied().reduce(f64::min).unwrap_or(0.0),
        AggregateOp::Max => samples.iter().flatten().copied().reduce(f64::max).unwrap_or(0.0),
    }
}
