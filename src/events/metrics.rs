// src/events/metrics.rs

//! Timing breakdown attached to `sparkTaskEnd`.
//!
//! All durations are milliseconds. Proportions are percentages of the
//! task's total duration; computing time absorbs whatever the other
//! phases do not account for, so the proportions sum to 100 for any task
//! with a non-zero duration.

use serde::Serialize;

use crate::client::model::RawTaskMetrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub duration: i64,
    pub executor_run_time: i64,
    pub executor_computing_time: i64,
    pub scheduler_delay: i64,
    pub shuffle_read_time: i64,
    pub shuffle_write_time: i64,
    pub serialization_time: i64,
    pub deserialization_time: i64,
    pub getting_result_time: i64,
    pub jvm_gc_time: i64,
    pub result_size: i64,
    pub memory_bytes_spilled: i64,
    pub disk_bytes_spilled: i64,
    pub peak_execution_memory: i64,
    pub executor_computing_time_proportion: f64,
    pub scheduler_delay_proportion: f64,
    pub shuffle_read_time_proportion: f64,
    pub shuffle_write_time_proportion: f64,
    pub serialization_time_proportion: f64,
    pub deserialization_time_proportion: f64,
    pub getting_result_time_proportion: f64,
}

impl TaskMetrics {
    /// Build the breakdown for a finished task.
    ///
    /// `scheduler_delay` is used when the remote side reports it; otherwise
    /// it is whatever part of `duration` no executor phase accounts for.
    pub fn compute(
        raw: &RawTaskMetrics,
        duration: i64,
        getting_result_time: i64,
        scheduler_delay: Option<i64>,
    ) -> Self {
        let duration = duration.max(0);
        let shuffle_read_time = raw
            .shuffle_read_metrics
            .as_ref()
            .map_or(0, |m| m.fetch_wait_time);
        let shuffle_write_time = raw
            .shuffle_write_metrics
            .as_ref()
            .map_or(0, |m| m.write_time / 1_000_000);
        let serialization_time = raw.result_serialization_time;
        let deserialization_time = raw.executor_deserialize_time;
        let executor_run_time = raw.executor_run_time;

        let scheduler_delay = scheduler_delay.unwrap_or_else(|| {
            duration
                - executor_run_time
                - deserialization_time
                - serialization_time
                - getting_result_time
        });
        let scheduler_delay = scheduler_delay.max(0);
        let executor_computing_time =
            (executor_run_time - shuffle_read_time - shuffle_write_time).max(0);

        let proportion = |part: i64| -> f64 {
            if duration > 0 {
                part as f64 / duration as f64 * 100.0
            } else {
                0.0
            }
        };

        let scheduler_delay_proportion = proportion(scheduler_delay);
        let shuffle_read_time_proportion = proportion(shuffle_read_time);
        let shuffle_write_time_proportion = proportion(shuffle_write_time);
        let serialization_time_proportion = proportion(serialization_time);
        let deserialization_time_proportion = proportion(deserialization_time);
        let getting_result_time_proportion = proportion(getting_result_time);

        let executor_computing_time_proportion = if duration > 0 {
            (100.0
                - scheduler_delay_proportion
                - shuffle_read_time_proportion
                - shuffle_write_time_proportion
                - serialization_time_proportion
                - deserialization_time_proportion
                - getting_result_time_proportion)
                .max(0.0)
        } else {
            0.0
        };

        Self {
            duration,
            executor_run_time,
            executor_computing_time,
            scheduler_delay,
            shuffle_read_time,
            shuffle_write_time,
            serialization_time,
            deserialization_time,
            getting_result_time,
            jvm_gc_time: raw.jvm_gc_time,
            result_size: raw.result_size,
            memory_bytes_spilled: raw.memory_bytes_spilled,
            disk_bytes_spilled: raw.disk_bytes_spilled,
            peak_execution_memory: raw.peak_execution_memory,
            executor_computing_time_proportion,
            scheduler_delay_proportion,
            shuffle_read_time_proportion,
            shuffle_write_time_proportion,
            serialization_time_proportion,
            deserialization_time_proportion,
            getting_result_time_proportion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::model::{ShuffleReadMetrics, ShuffleWriteMetrics};

    fn raw() -> RawTaskMetrics {
        RawTaskMetrics {
            executor_deserialize_time: 10,
            executor_run_time: 70,
            result_serialization_time: 5,
            shuffle_read_metrics: Some(ShuffleReadMetrics {
                fetch_wait_time: 20,
                ..ShuffleReadMetrics::default()
            }),
            shuffle_write_metrics: Some(ShuffleWriteMetrics {
                write_time: 10_000_000,
                ..ShuffleWriteMetrics::default()
            }),
            ..RawTaskMetrics::default()
        }
    }

    #[test]
    fn scheduler_delay_is_inferred_from_unaccounted_time() {
        let m = TaskMetrics::compute(&raw(), 100, 0, None);
        assert_eq!(m.scheduler_delay, 15);
        assert_eq!(m.shuffle_write_time, 10);
        assert_eq!(m.executor_computing_time, 40);
    }

    #[test]
    fn proportions_sum_to_one_hundred() {
        let m = TaskMetrics::compute(&raw(), 100, 0, None);
        let total = m.executor_computing_time_proportion
            + m.scheduler_delay_proportion
            + m.shuffle_read_time_proportion
            + m.shuffle_write_time_proportion
            + m.serialization_time_proportion
            + m.deserialization_time_proportion
            + m.getting_result_time_proportion;
        assert!((total - 100.0).abs() < 1e-9);
        assert!((m.shuffle_read_time_proportion - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_yields_zero_proportions() {
        let m = TaskMetrics::compute(&raw(), 0, 0, None);
        assert_eq!(m.executor_computing_time_proportion, 0.0);
        assert_eq!(m.scheduler_delay, 0);
    }

    #[test]
    fn reported_scheduler_delay_wins() {
        let m = TaskMetrics::compute(&raw(), 100, 0, Some(3));
        assert_eq!(m.scheduler_delay, 3);
    }
}
