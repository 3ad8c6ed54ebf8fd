// src/tracker/mod.rs

//! Generic lifecycle bookkeeping for jobs, stages and tasks.
//!
//! An [`EntityTracker`] holds two collections:
//! - `tracking`: entities seen non-terminal, keyed by id, with their most
//!   recent snapshot
//! - `completed`: ids that have been retired
//!
//! An id lives in at most one of them, and moves from `tracking` to
//! `completed` exactly once. Both are ordered by key so callers iterating
//! the tracker produce events in a reproducible order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use tracing::debug;

/// Anything with a notion of "finished".
pub trait Lifecycle {
    fn is_terminal(&self) -> bool;
}

/// Result of feeding a snapshot into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First sighting, still running: publish a start event.
    Start,
    /// Still running: nothing to publish.
    Continue,
    /// Tracked entity finished: publish an end event.
    End,
    /// First sighting and already finished: publish start then end.
    FastPath,
    /// Already retired earlier; the snapshot is ignored.
    Retired,
}

impl Transition {
    pub fn emits_start(self) -> bool {
        matches!(self, Transition::Start | Transition::FastPath)
    }

    pub fn emits_end(self) -> bool {
        matches!(self, Transition::End | Transition::FastPath)
    }
}

#[derive(Debug)]
pub struct EntityTracker<K, V> {
    tracking: BTreeMap<K, V>,
    completed: BTreeSet<K>,
}

impl<K, V> Default for EntityTracker<K, V> {
    fn default() -> Self {
        Self {
            tracking: BTreeMap::new(),
            completed: BTreeSet::new(),
        }
    }
}

impl<K, V> EntityTracker<K, V>
where
    K: Ord + Clone + Debug,
    V: Lifecycle,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fresh snapshot for `id`.
    pub fn observe(&mut self, id: K, snapshot: V) -> Transition {
        if self.completed.contains(&id) {
            debug!(?id, "snapshot for retired entity ignored");
            return Transition::Retired;
        }

        let terminal = snapshot.is_terminal();
        let tracked = self.tracking.contains_key(&id);

        match (tracked, terminal) {
            (false, false) => {
                self.tracking.insert(id, snapshot);
                Transition::Start
            }
            (false, true) => {
                self.completed.insert(id);
                Transition::FastPath
            }
            (true, false) => {
                self.tracking.insert(id, snapshot);
                Transition::Continue
            }
            (true, true) => {
                self.tracking.remove(&id);
                self.completed.insert(id);
                Transition::End
            }
        }
    }

    /// Retire `id` regardless of what its snapshot says.
    ///
    /// Used when a parent finished and its children must be closed out.
    pub fn retire(&mut self, id: K) -> Transition {
        if self.completed.contains(&id) {
            return Transition::Retired;
        }

        let transition = if self.tracking.remove(&id).is_some() {
            Transition::End
        } else {
            Transition::FastPath
        };
        self.completed.insert(id);
        transition
    }

    /// Retire every still-tracked entity, returning the last snapshots in
    /// key order.
    pub fn drain_tracked(&mut self) -> Vec<(K, V)> {
        let drained: Vec<(K, V)> = std::mem::take(&mut self.tracking).into_iter().collect();
        for (id, _) in &drained {
            self.completed.insert(id.clone());
        }
        drained
    }

    /// Like [`drain_tracked`](Self::drain_tracked), limited to the
    /// entities `keep` selects. The rest stay tracked.
    pub fn drain_tracked_where<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let ids: Vec<K> = self
            .tracking
            .iter()
            .filter(|(id, snap)| keep(id, snap))
            .map(|(id, _)| id.clone())
            .collect();

        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(snap) = self.tracking.remove(&id) {
                self.completed.insert(id.clone());
                drained.push((id, snap));
            }
        }
        drained
    }

    pub fn is_tracked(&self, id: &K) -> bool {
        self.tracking.contains_key(id)
    }

    pub fn is_completed(&self, id: &K) -> bool {
        self.completed.contains(id)
    }

    /// Whether `id` has been seen at all.
    pub fn is_known(&self, id: &K) -> bool {
        self.is_tracked(id) || self.is_completed(id)
    }

    pub fn get(&self, id: &K) -> Option<&V> {
        self.tracking.get(id)
    }

    /// Ids currently tracked, in key order.
    pub fn tracked_ids(&self) -> Vec<K> {
        self.tracking.keys().cloned().collect()
    }

    pub fn tracked(&self) -> impl Iterator<Item = (&K, &V)> {
        self.tracking.iter()
    }

    pub fn tracking_len(&self) -> usize {
        self.tracking.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tracking.is_empty()
    }
}
