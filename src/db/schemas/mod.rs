//! Database schemas for taskkeep
//!
//! Defines MongoDB document structures. There is no accounts collection: an
//! owner exists exactly when at least one task names it.

mod metadata;
mod task;

pub use metadata::Metadata;
pub use task::{Priority, TaskDoc, TASK_COLLECTION};
