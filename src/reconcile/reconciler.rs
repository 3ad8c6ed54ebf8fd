// src/reconcile/reconciler.rs

//! The per-statement poll loop.
//!
//! Each cycle runs in two phases:
//! - fetch: every remote call the cycle needs, decided from the trackers
//!   as they were at the start of the cycle; nothing is mutated
//! - apply: feed the fetched snapshots through the trackers and publish
//!   the resulting events, without awaiting
//!
//! A cycle aborted by a transport error or by cancellation therefore
//! leaves no half-applied state behind, and the next cycle simply
//! retries.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::client::RemoteExecutionClient;
use crate::client::model::{ExecutorSummary, JobSnapshot, StageAttempt, StatementSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::errors::{MonitorError, Result};
use crate::events::{ApplicationStart, EventBody, EventSink, JobReceived, SparkEvent};
use crate::tracker::{EntityTracker, Lifecycle, Transition};
use crate::types::{JobId, JobStatus};

use super::detail::StageBook;
use super::executors::ExecutorDiffer;
use super::records::{self, ClusterShape};
use super::result::{self, StatementResult};
use super::{ApplicationState, CycleReport, ReconcileOptions, StatementContext};

static SYSTEM_CLOCK: SystemClock = SystemClock;

/// A job snapshot plus, when the job is terminal, every attempt of each
/// of its stages.
#[derive(Debug)]
struct FetchedJob {
    job: JobSnapshot,
    stages: Vec<StageAttempt>,
}

#[derive(Debug, Default)]
struct CycleFetch {
    refreshed: Vec<FetchedJob>,
    drill_down: Option<(JobId, Vec<StageAttempt>)>,
    discovered: Vec<FetchedJob>,
    executors: Vec<ExecutorSummary>,
}

pub struct Reconciler<'a, C: ?Sized, S: ?Sized> {
    client: &'a C,
    sink: &'a S,
    clock: &'a dyn Clock,
    ctx: StatementContext,
    app: &'a mut ApplicationState,
    executors: &'a mut ExecutorDiffer,
    options: ReconcileOptions,
    jobs: EntityTracker<JobId, JobSnapshot>,
    stages: StageBook,
    last_statement: Option<StatementSnapshot>,
}

impl<'a, C, S> Reconciler<'a, C, S>
where
    C: RemoteExecutionClient + ?Sized,
    S: EventSink + ?Sized,
{
    pub fn new(
        client: &'a C,
        sink: &'a S,
        ctx: StatementContext,
        app: &'a mut ApplicationState,
        executors: &'a mut ExecutorDiffer,
    ) -> Self {
        Self {
            client,
            sink,
            clock: &SYSTEM_CLOCK,
            ctx,
            app,
            executors,
            options: ReconcileOptions::default(),
            jobs: EntityTracker::new(),
            stages: StageBook::new(),
            last_statement: None,
        }
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &StatementContext {
        &self.ctx
    }

    /// Number of jobs still being tracked.
    pub fn tracked_jobs(&self) -> usize {
        self.jobs.tracking_len()
    }

    /// Poll until the statement and all of its jobs are terminal, then
    /// interpret the statement's output.
    ///
    /// Cancelling `cancel` stops the loop at the next await point with
    /// [`MonitorError::Cancelled`]. Transport errors abort only the
    /// current cycle until `max_consecutive_failures` cycles in a row
    /// have failed.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<StatementResult> {
        info!(
            session_id = self.ctx.session_id,
            statement_id = self.ctx.statement_id,
            job_group = %self.ctx.job_group,
            "monitoring statement"
        );

        let received = EventBody::JobReceived(JobReceived {
            statement_id: self.ctx.statement_id,
            job_group: self.ctx.job_group.clone(),
            time: self.clock.now_ms(),
        });
        self.publish(vec![received]);

        let mut failures: u32 = 0;
        loop {
            let cycle = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                cycle = self.poll_once() => cycle,
            };

            match cycle {
                Ok(report) => {
                    failures = 0;
                    if report.finished {
                        break;
                    }
                }
                Err(err) if err.is_transient() => {
                    failures += 1;
                    if failures >= self.options.max_consecutive_failures {
                        error!(
                            statement_id = self.ctx.statement_id,
                            failures,
                            error = %err,
                            "giving up after consecutive failed poll cycles"
                        );
                        return Err(err);
                    }
                    warn!(
                        statement_id = self.ctx.statement_id,
                        failures,
                        error = %err,
                        "poll cycle failed; retrying next tick"
                    );
                }
                Err(err) => return Err(err),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }

        info!(statement_id = self.ctx.statement_id, "statement finished");
        let output = self
            .last_statement
            .as_ref()
            .and_then(|stmt| stmt.output.as_ref());
        result::interpret(output)
    }

    /// Run one poll cycle.
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        let statement = self
            .client
            .get_statement(self.ctx.session_id, self.ctx.statement_id)
            .await?;
        let statement_state = statement.state()?;

        let mut published = self.resolve_application().await?;

        let mut drill_down = None;
        if let Some(app_id) = self.app.app_id().map(str::to_string) {
            let fetch = self.fetch(&app_id).await?;
            drill_down = fetch.drill_down.as_ref().map(|(id, _)| *id);

            let now = self.clock.now_ms();
            let events = self.apply(fetch, &app_id, now);
            published += self.publish(events);
        } else {
            trace!(
                statement_id = self.ctx.statement_id,
                "application not known yet; skipping job polling"
            );
        }

        let finished = statement_state.is_terminal() && self.jobs.is_idle();
        self.last_statement = Some(statement);

        debug!(
            statement_id = self.ctx.statement_id,
            state = ?statement_state,
            published,
            ?drill_down,
            tracked_jobs = self.jobs.tracking_len(),
            finished,
            "poll cycle complete"
        );

        Ok(CycleReport {
            statement_state,
            published,
            drill_down,
            finished,
        })
    }

    /// Look up the application id until the session reports one, and
    /// announce the application the first time it is seen.
    async fn resolve_application(&mut self) -> Result<usize> {
        if self.app.is_started() {
            return Ok(0);
        }

        let session = self.client.get_session(self.ctx.session_id).await?;
        let Some(app_id) = session.known_app_id().map(str::to_string) else {
            return Ok(0);
        };

        let info = match self
            .client
            .get_application(self.ctx.session_id, &app_id)
            .await
        {
            Ok(info) => info,
            Err(err) => {
                warn!(app_id = %app_id, error = %err, "application info unavailable");
                None
            }
        };
        let attempt = info.as_ref().and_then(|i| i.attempts.first());
        let start_time = attempt
            .and_then(|a| a.start_time)
            .unwrap_or_else(|| self.clock.now_ms());

        let body = EventBody::ApplicationStart(ApplicationStart {
            app_id: app_id.clone(),
            app_name: info.as_ref().map(|i| i.name.clone()).unwrap_or_default(),
            app_attempt_id: attempt.and_then(|a| a.attempt_id.clone()),
            spark_user: attempt.and_then(|a| a.spark_user.clone()),
            start_time,
        });

        info!(app_id = %app_id, "spark application started");
        self.app.record_start(app_id, start_time);
        Ok(self.publish(vec![body]))
    }

    async fn fetch(&self, app_id: &str) -> Result<CycleFetch> {
        let session = self.ctx.session_id;
        let mut fetch = CycleFetch::default();

        // Tracked jobs, ascending. The last one still running is drilled
        // into.
        let mut drill_down: Option<JobSnapshot> = None;
        for job_id in self.jobs.tracked_ids() {
            let job = self.client.get_job_by_id(session, app_id, job_id).await?;
            let stages = if job.is_terminal() {
                self.fetch_job_stages(app_id, &job).await?
            } else {
                if job.status == JobStatus::Running {
                    drill_down = Some(job.clone());
                }
                Vec::new()
            };
            fetch.refreshed.push(FetchedJob { job, stages });
        }

        if let Some(job) = drill_down {
            let attempts = self.fetch_drill_down(app_id, &job).await?;
            fetch.drill_down = Some((job.job_id, attempts));
        }

        let mut new_jobs: Vec<JobSnapshot> = self
            .client
            .get_jobs(session, app_id)
            .await?
            .unwrap_or_default()
            .into_iter()
            .filter(|job| job.job_group.as_deref() == Some(self.ctx.job_group.as_str()))
            .filter(|job| !self.jobs.is_known(&job.job_id))
            .collect();
        new_jobs.sort_by_key(|job| job.job_id);
        new_jobs.dedup_by_key(|job| job.job_id);

        for job in new_jobs {
            let stages = if job.is_terminal() {
                self.fetch_job_stages(app_id, &job).await?
            } else {
                Vec::new()
            };
            fetch.discovered.push(FetchedJob { job, stages });
        }

        fetch.executors = self
            .client
            .get_executors(session, app_id)
            .await?
            .unwrap_or_default();

        Ok(fetch)
    }

    /// Every attempt of every stage of a finished job.
    async fn fetch_job_stages(&self, app_id: &str, job: &JobSnapshot) -> Result<Vec<StageAttempt>> {
        let mut attempts = Vec::new();
        for &stage_id in &job.stage_ids {
            let found = self
                .client
                .get_stage_by_id(self.ctx.session_id, app_id, stage_id)
                .await?;
            attempts.extend(found.unwrap_or_default());
        }
        attempts.sort_by_key(StageAttempt::key);
        Ok(attempts)
    }

    /// Tracked attempts are re-polled directly; stages with nothing
    /// tracked are listed to discover new attempts.
    async fn fetch_drill_down(&self, app_id: &str, job: &JobSnapshot) -> Result<Vec<StageAttempt>> {
        let session = self.ctx.session_id;
        let mut attempts = Vec::new();

        for &stage_id in &job.stage_ids {
            let tracked = self.stages.tracked_attempts(stage_id);

            if tracked.is_empty() {
                let found = self
                    .client
                    .get_stage_by_id(session, app_id, stage_id)
                    .await?;
                attempts.extend(found.unwrap_or_default());
            } else {
                for key in tracked {
                    let attempt = self
                        .client
                        .get_stage_attempt_by_id(session, app_id, key.stage_id, key.attempt_id)
                        .await?;
                    attempts.push(attempt);
                }
            }
        }

        attempts.sort_by_key(StageAttempt::key);
        Ok(attempts)
    }

    fn apply(&mut self, fetch: CycleFetch, app_id: &str, now: i64) -> Vec<EventBody> {
        let mut out = Vec::new();

        for FetchedJob { job, stages } in fetch.refreshed {
            match self.jobs.observe(job.job_id, job.clone()) {
                Transition::End => self.finish_job(&job, stages, now, &mut out),
                Transition::Continue => {}
                other => warn!(job_id = job.job_id, ?other, "unexpected transition for tracked job"),
            }
        }

        if let Some((job_id, attempts)) = fetch.drill_down {
            for attempt in attempts {
                self.stages.observe_stage(job_id, attempt, now, &mut out);
            }
        }

        let cluster = ClusterShape {
            total_cores: self.executors.total_cores(),
            num_executors: self.executors.len(),
        };
        for FetchedJob { job, stages } in fetch.discovered {
            let transition = self.jobs.observe(job.job_id, job.clone());
            if transition.emits_start() {
                info!(job_id = job.job_id, status = ?job.status, "job started");
                out.push(EventBody::JobStart(records::job_start(
                    &job,
                    &self.ctx.job_group,
                    app_id,
                    cluster,
                    now,
                )));
            }
            if transition == Transition::FastPath {
                self.finish_job(&job, stages, now, &mut out);
            }
        }

        // An empty executor list means "nothing reported", not "all gone".
        if !fetch.executors.is_empty() {
            out.extend(self.executors.apply(&fetch.executors, now));
        }

        out
    }

    /// Close out every stage and task of `job`, then end the job. Stages
    /// already ended under an earlier job are left alone.
    fn finish_job(
        &mut self,
        job: &JobSnapshot,
        stages: Vec<StageAttempt>,
        now: i64,
        out: &mut Vec<EventBody>,
    ) {
        let succeeded = job.status == JobStatus::Succeeded;
        for attempt in stages {
            self.stages.force_stage(job.job_id, attempt, succeeded, now, out);
        }
        self.stages.drain_job(job.job_id, succeeded, now, out);

        info!(job_id = job.job_id, status = ?job.status, "job ended");
        out.push(EventBody::JobEnd(records::job_end(job, now)));
    }

    fn publish(&self, events: Vec<EventBody>) -> usize {
        let count = events.len();
        for body in events {
            trace!(kind = body.kind(), "publishing event");
            self.sink
                .publish(SparkEvent::new(self.ctx.cell_guid.clone(), body));
        }
        count
    }
}
