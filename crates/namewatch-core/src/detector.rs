//! Change detection
//!
//! Compares each newly fetched display name with the last one observed.
//! Comparison is exact: case-sensitive, no whitespace or Unicode
//! normalization.

/// Classification of one successful observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Nothing was known before; seeds state, never alerts
    FirstObservation,
    /// Same value as last time
    Unchanged,
    /// The value differs from the last observation
    Changed {
        /// The value observed before this one
        previous: String,
    },
}

impl Classification {
    pub fn is_changed(&self) -> bool {
        matches!(self, Classification::Changed { .. })
    }
}

/// Remembers the last observed value and classifies new ones against it
///
/// Only successful fetches should be fed to [`remember`](Self::remember); a
/// failed cycle leaves the memory untouched so it is never mistaken for "no
/// change".
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_value: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `current` against `previous`
    pub fn classify(previous: Option<&str>, current: &str) -> Classification {
        match previous {
            None => Classification::FirstObservation,
            Some(previous) if previous == current => Classification::Unchanged,
            Some(previous) => Classification::Changed {
                previous: previous.to_string(),
            },
        }
    }

    /// Classify `current` against the remembered value
    pub fn check(&self, current: &str) -> Classification {
        Self::classify(self.last_value.as_deref(), current)
    }

    /// Make `current` the value future observations are compared with
    pub fn remember(&mut self, current: &str) {
        self.last_value = Some(current.to_string());
    }

    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }
}
