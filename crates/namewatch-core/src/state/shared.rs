// # Shared State
//
// The latest observed snapshot, written by the poll loop and read by any number
// of concurrent query handlers.
//
// ## Consistency
//
// - A `Snapshot` is immutable; `write()` swaps the whole value under the write
//   lock, so readers see either the previous or the new snapshot, never a mix
// - Readers take the read lock and clone, so they do not block each other
// - Only successful cycles write; a failed fetch leaves the previous snapshot
//   in place

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::traits::Profile;

/// The observed state of the tracked account after one successful cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    name: String,
    handle: String,
    observed_at: DateTime<Utc>,
    changed: bool,
    last_changed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Build a snapshot from a fetched profile
    pub fn new(
        profile: &Profile,
        observed_at: DateTime<Utc>,
        changed: bool,
        last_changed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: profile.name.clone(),
            handle: profile.handle.clone(),
            observed_at,
            changed,
            last_changed_at,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account handle
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// When this value was fetched
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Whether this observation differed from the previous one
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// When a change was last detected, if ever
    pub fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.last_changed_at
    }
}

/// Cloneable handle to the current snapshot
///
/// Starts empty; [`read`](Self::read) returns `None` until the first
/// successful cycle.
///
/// # Example
///
/// ```rust
/// use namewatch_core::state::{SharedState, Snapshot};
/// use namewatch_core::traits::Profile;
///
/// #[tokio::main]
/// async fn main() {
///     let state = SharedState::new();
///     assert!(state.read().await.is_none());
///
///     let profile = Profile::new("Elon Musk", "elonmusk");
///     state.write(Snapshot::new(&profile, chrono::Utc::now(), false, None)).await;
///
///     let snapshot = state.read().await.unwrap();
///     assert_eq!(snapshot.name(), "Elon Musk");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SharedState {
    /// Create an empty shared state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot
    pub async fn write(&self, snapshot: Snapshot) {
        let mut guard = self.inner.write().await;
        *guard = Some(snapshot);
    }

    /// Copy of the current snapshot
    pub async fn read(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }
}
