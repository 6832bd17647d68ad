//! Read-receipt tracking driven by on-screen visibility.
//!
//! Received entries are registered when they enter the ledger. The renderer
//! reports how much of each registered entry is inside the viewport; the
//! first report at or above [`VISIBILITY_THRESHOLD`] observes the entry,
//! after which it is no longer tracked.

use std::collections::HashMap;

use super::ledger::EntryId;

/// Fraction of an entry that must be inside the viewport to count as seen.
pub const VISIBILITY_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observation {
    Unobserved,
    Observed,
}

/// Registration table of received entries awaiting observation.
#[derive(Debug, Default)]
pub struct ReceiptTracker {
    table: HashMap<EntryId, Observation>,
}

impl ReceiptTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an entry. Re-registering an observed entry does not
    /// make it observable again.
    pub fn watch(&mut self, id: EntryId) {
        self.table.entry(id).or_insert(Observation::Unobserved);
    }

    /// Report the visible fraction of an entry.
    ///
    /// Returns `true` exactly once per entry: on the first report at or above
    /// the threshold. Unknown entries return `false`.
    pub fn observe(&mut self, id: &EntryId, fraction: f32) -> bool {
        if fraction < VISIBILITY_THRESHOLD {
            return false;
        }
        match self.table.get_mut(id) {
            Some(state @ Observation::Unobserved) => {
                *state = Observation::Observed;
                true
            }
            _ => false,
        }
    }

    /// Make an observed entry observable again, for a seen signal that was
    /// never delivered. Unknown entries stay unknown.
    pub fn unobserve(&mut self, id: &EntryId) {
        if let Some(state) = self.table.get_mut(id) {
            *state = Observation::Unobserved;
        }
    }

    /// Whether the renderer should still report this entry.
    #[must_use]
    pub fn is_watching(&self, id: &EntryId) -> bool {
        self.table.get(id) == Some(&Observation::Unobserved)
    }

    /// Number of entries still awaiting observation.
    #[must_use]
    pub fn watching_count(&self) -> usize {
        self.table
            .values()
            .filter(|o| **o == Observation::Unobserved)
            .count()
    }

    /// Drop an entry from the table entirely.
    pub fn forget(&mut self, id: &EntryId) {
        self.table.remove(id);
    }

    /// Drop all registrations (entering a new room).
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

/// Fraction of the row span `[top, top + height)` inside the viewport
/// `[viewport_top, viewport_top + viewport_height)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn visible_fraction(
    top: usize,
    height: usize,
    viewport_top: usize,
    viewport_height: usize,
) -> f32 {
    if height == 0 {
        return 0.0;
    }
    let start = top.max(viewport_top);
    let end = (top + height).min(viewport_top + viewport_height);
    end.saturating_sub(start) as f32 / height as f32
}
