//! Services layer for taskkeep
//!
//! Business logic between the tool layer and the stores.
//!
//! ## Services
//!
//! - **Authenticator**: per-call identity according to the auth mode
//! - **TaskService**: owner-scoped task operations and input validation

pub mod session;
pub mod tasks;

pub use session::{Activation, Authenticator, DeviceStatus};
pub use tasks::{CompleteOutcome, NewTaskInput, TaskService, TaskStats, MAX_TITLE_LEN};
