//! Shared types for taskkeep

mod error;
mod owner;

pub use error::{Result, TaskkeepError};
pub use owner::{OwnerId, Secret};
