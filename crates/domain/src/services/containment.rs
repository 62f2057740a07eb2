//! Per-target containment bookkeeping.
//!
//! Remembers, for each target id, whether the device was last known to be
//! inside the target radius. Targets never seen are treated as outside, which
//! makes transition detection edge-triggered.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// In-memory map from target id to "currently inside".
///
/// Owned by a single monitoring session and mutated only from its evaluation
/// path, so it carries no internal locking.
#[derive(Debug, Default, Clone)]
pub struct ContainmentTracker {
    inside: HashMap<Uuid, bool>,
}

impl ContainmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` for targets that have never been observed.
    pub fn is_inside(&self, target_id: Uuid) -> bool {
        self.inside.get(&target_id).copied().unwrap_or(false)
    }

    /// Whether the target has an entry at all (inside or outside).
    #[cfg(test)]
    pub(crate) fn is_tracked(&self, target_id: Uuid) -> bool {
        self.inside.contains_key(&target_id)
    }

    pub fn set_inside(&mut self, target_id: Uuid, inside: bool) {
        self.inside.insert(target_id, inside);
    }

    /// Drops tracked state so the target starts over as unknown (outside).
    /// Returns whether an entry existed.
    pub fn remove(&mut self, target_id: Uuid) -> bool {
        self.inside.remove(&target_id).is_some()
    }

    /// Releases every entry whose id is not in `active`, returning the released ids.
    pub fn retain_targets(&mut self, active: &HashSet<Uuid>) -> Vec<Uuid> {
        let released: Vec<Uuid> = self
            .inside
            .keys()
            .filter(|id| !active.contains(id))
            .copied()
            .collect();
        for id in &released {
            self.inside.remove(id);
        }
        released
    }

    #[cfg(test)]
    pub(crate) fn tracked_count(&self) -> usize {
        self.inside.len()
    }
}
