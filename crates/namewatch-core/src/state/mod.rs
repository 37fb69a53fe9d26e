// # Published State
//
// This module provides the snapshot type and the shared handle through which
// the poll loop publishes it to query callers.

pub mod shared;

pub use shared::{SharedState, Snapshot};
