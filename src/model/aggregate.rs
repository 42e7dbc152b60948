// src/model/aggregate.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::CustomFieldId;

/// Aggregate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Avg => "avg",
        }
    }
}

impl FromStr for AggregateOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregateOp::Sum),
            "min" => Ok(AggregateOp::Min),
            "max" => Ok(AggregateOp::Max),
            "avg" => Ok(AggregateOp::Avg),
            other => Err(format!("unknown aggregate operator '{}'", other)),
        }
    }
}

/// Attribute an aggregate is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateTarget {
    /// Regular numeric attribute of the base kind.
    Field(String),
    /// Numeric custom attribute.
    CustomField(CustomFieldId),
}

/// Parsed form of an aggregate column key.
///
/// Keys are `<field>__<op>` for regular attributes and
/// `cf__<custom field id>__<op>` for custom ones, e.g. `capital__min`
/// or `cf__12__sum`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateSpec {
    pub target: AggregateTarget,
    pub op: AggregateOp,
}

impl AggregateSpec {
    pub fn field(name: impl Into<String>, op: AggregateOp) -> Self {
        Self {
            target: AggregateTarget::Field(name.into()),
            op,
        }
    }

    pub fn custom(id: CustomFieldId, op: AggregateOp) -> Self {
        Self {
            target: AggregateTarget::CustomField(id),
            op,
        }
    }

    /// The composite key stored as the column name.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            AggregateTarget::Field(name) => write!(f, "{}__{}", name, self.op.as_str()),
            AggregateTarget::CustomField(id) => write!(f, "cf__{}__{}", id, self.op.as_str()),
        }
    }
}

impl FromStr for AggregateSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, op) = s
            .rsplit_once("__")
            .ok_or_else(|| format!("aggregate key '{}' has no operator", s))?;
        let op: AggregateOp = op.parse()?;

        if target.is_empty() {
            return Err(format!("aggregate key '{}' has no attribute", s));
        }

        let target = match target.strip_prefix("cf__") {
            Some(id) => {
                let id: u32 = id
                    .parse()
                    .map_err(|_| format!("invalid custom field id in aggregate key '{}'", s))?;
                AggregateTarget::CustomField(CustomFieldId(id))
            }
            None => AggregateTarget::Field(target.to_string()),
        };

        Ok(Self { target, op })
    }
}
