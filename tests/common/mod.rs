#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use sparkmon::events::EventBody;
use sparkmon::reconcile::{ApplicationState, ExecutorDiffer, ReconcileOptions};

pub use sparkmon_test_utils::init_tracing;

pub const SESSION: i64 = 3;
pub const STATEMENT: i64 = 7;
pub const GROUP: &str = "7";
pub const APP: &str = "application_1700000000000_0001";

/// Session-scoped state a reconciler run borrows.
#[derive(Debug, Default)]
pub struct SessionParts {
    pub app: ApplicationState,
    pub executors: ExecutorDiffer,
}

pub fn fast_options() -> ReconcileOptions {
    ReconcileOptions {
        poll_interval: Duration::from_millis(10),
        max_consecutive_failures: 3,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Job,
    Stage,
    Task,
}

/// Every end has exactly one earlier start for the same entity, and every
/// start is eventually ended.
pub fn assert_lifecycle_balanced(events: &[EventBody]) {
    let mut open: BTreeMap<(Level, i64, i64), bool> = BTreeMap::new();

    for event in events {
        let (key, is_start) = match event {
            EventBody::JobStart(e) => ((Level::Job, e.job_id, 0), true),
            EventBody::JobEnd(e) => ((Level::Job, e.job_id, 0), false),
            EventBody::StageSubmitted(e) => ((Level::Stage, e.stage_id, e.stage_attempt_id), true),
            EventBody::StageCompleted(e) => ((Level::Stage, e.stage_id, e.stage_attempt_id), false),
            EventBody::TaskStart(e) => ((Level::Task, e.task_id, 0), true),
            EventBody::TaskEnd(e) => ((Level::Task, e.task_id, 0), false),
            _ => continue,
        };

        if is_start {
            assert!(
                open.insert(key, true).is_none(),
                "entity {key:?} started twice"
            );
        } else {
            match open.get(&key).copied() {
                Some(true) => {
                    open.insert(key, false);
                }
                Some(false) => panic!("entity {key:?} ended twice"),
                None => panic!("entity {key:?} ended without a start"),
            }
        }
    }

    let unfinished: Vec<_> = open.iter().filter(|(_, o)| **o).map(|(k, _)| *k).collect();
    assert!(unfinished.is_empty(), "entities never ended: {unfinished:?}");
}

/// Kinds of the events that belong to the job hierarchy or executors.
pub fn workload_kinds(events: &[EventBody]) -> Vec<&'static str> {
    events
        .iter()
        .map(EventBody::kind)
        .filter(|k| {
            ![
                EventBody::JOB_RECEIVED,
                EventBody::APPLICATION_START,
                EventBody::APPLICATION_END,
            ]
            .contains(k)
        })
        .collect()
}
