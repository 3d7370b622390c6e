//! Logging infrastructure for taskkeep
//!
//! Provides the structured per-call usage event.

pub mod usage;

pub use usage::{Outcome, ToolCallEvent};
