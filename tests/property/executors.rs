use std::collections::BTreeSet;

use proptest::prelude::*;
use sparkmon::client::ExecutorSummary;
use sparkmon::events::EventBody;
use sparkmon::reconcile::ExecutorDiffer;
use sparkmon_test_utils::builders::executor;

// Ids are drawn from a small pool so that snapshots overlap; "driver" is
// mixed in and must never be counted.
fn snapshot_strategy() -> impl Strategy<Value = Vec<ExecutorSummary>> {
    proptest::collection::vec((0..6usize, 1..=16u32), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(idx, cores)| {
                let id = if idx == 0 {
                    "driver".to_string()
                } else {
                    idx.to_string()
                };
                executor(&id, cores)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn core_total_tracks_additions_and_removals(
        initial in 0..64i64,
        snapshots in proptest::collection::vec(snapshot_strategy(), 1..12),
    ) {
        let mut differ = ExecutorDiffer::with_initial_total(initial);
        let mut expected = initial;

        for (cycle, snapshot) in snapshots.iter().enumerate() {
            let diff = differ.diff(snapshot);
            let added: i64 = diff.added.iter().map(|e| i64::from(e.total_cores)).sum();
            let removed: i64 = diff.removed.iter().map(|e| i64::from(e.total_cores)).sum();
            expected += added - removed;

            let events = differ.apply(snapshot, cycle as i64);

            prop_assert_eq!(differ.total_cores(), expected);
            prop_assert_eq!(events.len(), diff.added.len() + diff.removed.len());

            // Removals come first.
            let first_added = events
                .iter()
                .position(|e| matches!(e, EventBody::ExecutorAdded(_)))
                .unwrap_or(events.len());
            prop_assert!(events[first_added..]
                .iter()
                .all(|e| matches!(e, EventBody::ExecutorAdded(_))));

            let members: BTreeSet<&str> = snapshot
                .iter()
                .filter(|e| e.id != "driver")
                .map(|e| e.id.as_str())
                .collect();
            prop_assert_eq!(differ.len(), members.len());
        }
    }

    #[test]
    fn reapplying_the_same_snapshot_is_silent(snapshot in snapshot_strategy()) {
        let mut differ = ExecutorDiffer::new();
        differ.apply(&snapshot, 1);
        let total = differ.total_cores();

        prop_assert!(differ.diff(&snapshot).is_empty());
        prop_assert!(differ.apply(&snapshot, 2).is_empty());
        prop_assert_eq!(differ.total_cores(), total);
    }

    #[test]
    fn driver_never_affects_membership(cores in 1..=32u32) {
        let mut differ = ExecutorDiffer::new();
        let events = differ.apply(&[executor("driver", cores)], 1);

        prop_assert!(events.is_empty());
        prop_assert_eq!(differ.total_cores(), 0);
        prop_assert!(differ.is_empty());
    }
}
