// src/reconcile/executors.rs

//! Executor membership diffing and the running core total.
//!
//! One [`ExecutorDiffer`] lives for the whole session and is lent to each
//! reconciler run. The core total is an accumulator: it only moves by the
//! cores of executors added or removed, and is never recomputed from a
//! snapshot.

use std::collections::BTreeMap;

use tracing::debug;

use crate::client::model::ExecutorSummary;
use crate::events::{EventBody, ExecutorAdded, ExecutorRemoved};

/// Result of comparing the known executor set against a fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorDiff {
    /// New executors, ascending by id.
    pub added: Vec<ExecutorSummary>,
    /// Executors gone since the last snapshot, ascending by id, with the
    /// cores they were added with.
    pub removed: Vec<ExecutorSummary>,
}

impl ExecutorDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ExecutorDiffer {
    known: BTreeMap<String, ExecutorSummary>,
    total_cores: i64,
}

impl ExecutorDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the accumulator from a non-zero total.
    pub fn with_initial_total(total_cores: i64) -> Self {
        Self {
            known: BTreeMap::new(),
            total_cores,
        }
    }

    pub fn total_cores(&self) -> i64 {
        self.total_cores
    }

    /// Number of known (non-driver) executors.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Set difference by executor id. The driver entry is ignored.
    pub fn diff(&self, current: &[ExecutorSummary]) -> ExecutorDiff {
        let current: BTreeMap<&str, &ExecutorSummary> = current
            .iter()
            .filter(|e| !e.is_driver())
            .map(|e| (e.id.as_str(), e))
            .collect();

        let removed = self
            .known
            .iter()
            .filter(|(id, _)| !current.contains_key(id.as_str()))
            .map(|(_, e)| e.clone())
            .collect();

        let added = current
            .iter()
            .filter(|(id, _)| !self.known.contains_key(**id))
            .map(|(_, e)| (*e).clone())
            .collect();

        ExecutorDiff { added, removed }
    }

    /// Diff against `current`, update membership and the core total, and
    /// return the events to publish: all removals, then all additions.
    pub fn apply(&mut self, current: &[ExecutorSummary], now: i64) -> Vec<EventBody> {
        let ExecutorDiff { added, removed } = self.diff(current);
        let mut events = Vec::with_capacity(added.len() + removed.len());

        for exec in removed {
            self.known.remove(&exec.id);
            self.total_cores -= i64::from(exec.total_cores);
            debug!(
                executor_id = %exec.id,
                total_cores = self.total_cores,
                "executor removed"
            );
            events.push(EventBody::ExecutorRemoved(ExecutorRemoved {
                executor_id: exec.id,
                total_cores: self.total_cores,
                time: now,
            }));
        }

        for exec in added {
            self.total_cores += i64::from(exec.total_cores);
            debug!(
                executor_id = %exec.id,
                cores = exec.total_cores,
                total_cores = self.total_cores,
                "executor added"
            );
            events.push(EventBody::ExecutorAdded(ExecutorAdded {
                executor_id: exec.id.clone(),
                host: exec.host().to_string(),
                num_cores: exec.total_cores,
                total_cores: self.total_cores,
                time: now,
            }));
            self.known.insert(exec.id.clone(), exec);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(id: &str, cores: u32) -> ExecutorSummary {
        ExecutorSummary {
            id: id.to_string(),
            total_cores: cores,
            host_port: format!("host-{id}:7337"),
        }
    }

    fn kinds(events: &[EventBody]) -> Vec<&'static str> {
        events.iter().map(EventBody::kind).collect()
    }

    #[test]
    fn driver_is_never_counted() {
        let mut differ = ExecutorDiffer::new();
        let events = differ.apply(&[exec("driver", 8), exec("1", 4)], 0);
        assert_eq!(events.len(), 1);
        assert_eq!(differ.total_cores(), 4);
        assert_eq!(differ.len(), 1);
    }

    #[test]
    fn removals_precede_additions() {
        let mut differ = ExecutorDiffer::new();
        differ.apply(&[exec("1", 4)], 0);

        let events = differ.apply(&[exec("2", 2)], 1);
        assert_eq!(
            kinds(&events),
            vec![EventBody::EXECUTOR_REMOVED, EventBody::EXECUTOR_ADDED]
        );
        match &events[0] {
            EventBody::ExecutorRemoved(e) => assert_eq!(e.total_cores, 0),
            other => panic!("unexpected {other:?}"),
        }
        match &events[1] {
            EventBody::ExecutorAdded(e) => {
                assert_eq!(e.total_cores, 2);
                assert_eq!(e.host, "host-2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unchanged_membership_emits_nothing() {
        let mut differ = ExecutorDiffer::with_initial_total(10);
        differ.apply(&[exec("1", 4)], 0);
        assert!(differ.apply(&[exec("1", 4)], 1).is_empty());
        assert_eq!(differ.total_cores(), 14);
    }

    #[test]
    fn removal_subtracts_cores_recorded_at_add_time() {
        let mut differ = ExecutorDiffer::new();
        differ.apply(&[exec("1", 4), exec("2", 2)], 0);
        // Executor 1 reappears with a different core count: membership
        // did not change, so neither does the total.
        differ.apply(&[exec("1", 16), exec("2", 2)], 1);
        differ.apply(&[exec("2", 2)], 2);
        assert_eq!(differ.total_cores(), 2);
    }

    #[test]
    fn diff_is_sorted_by_id() {
        let differ = ExecutorDiffer::new();
        let diff = differ.diff(&[exec("3", 1), exec("1", 1), exec("2", 1)]);
        let ids: Vec<_> = diff.added.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(diff.removed.is_empty());
    }
}
