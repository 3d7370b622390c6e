//! Database layer for taskkeep
//!
//! Provides MongoDB storage for task documents.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection, MongoConnector};
pub use schemas::{Metadata, Priority, TaskDoc, TASK_COLLECTION};
