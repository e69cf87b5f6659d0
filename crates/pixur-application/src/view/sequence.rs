use std::sync::atomic::{AtomicU64, Ordering};

/// Result of a view load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// The load finished and is now shown.
    Applied(T),
    /// A newer load was issued while this one ran; its result was dropped.
    Stale,
    /// Nothing further in the requested direction.
    End,
}

impl<T> LoadOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            LoadOutcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale)
    }
}

/// Issues monotonically increasing load tickets.
///
/// Only the newest ticket may publish its result.
#[derive(Debug, Default)]
pub struct LoadSequence {
    issued: AtomicU64,
}

impl LoadSequence {
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }
}
