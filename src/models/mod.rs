//! Domain models for the task tracker.
//!
//! # Core Concepts
//!
//! ## Persistent Entities
//!
//! - [`TodoItem`]: A tracked task, stored one item per id in the record table.
//!   Created once, mutated by partial updates, removed only by explicit delete.
//!
//! ## Ephemeral Entities
//!
//! These exist only for the duration of a request (or on the queue):
//!
//! - [`ExportResponse`]: Signed download link for a freshly uploaded CSV.
//! - [`QueuedExport`] / [`ExportQueueMessage`]: An export handed to the queue.
//! - [`FeatureFlags`]: Live snapshot of boolean switches from the parameter store.

mod export;
mod system;
mod timestamp;
mod todo;

use std::collections::BTreeMap;

pub use export::*;
pub use system::*;
pub use timestamp::*;
pub use todo::*;

/// Flag name to value. Ordered so JSON output is stable.
pub type FeatureFlags = BTreeMap<String, bool>;
