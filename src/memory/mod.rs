//! In-memory collaborators.
//!
//! [`MemoryStore`] serves a JSON [`Dataset`] through every trait in
//! [`crate::entity::backend`], so the engine can run without a host system:
//! from the CLI, in tests, or embedded in tools that export reports from a
//! snapshot.

mod dataset;
pub mod fixtures;
mod store;

pub use dataset::{
    Condition, ConditionOp, CustomValue, Dataset, DatasetError, EntityFilter, KindSchema,
    Relation, User,
};
pub use store::{FunctionFn, MemoryStore, LABEL_FUNCTION};
