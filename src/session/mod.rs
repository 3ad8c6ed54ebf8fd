// src/session/mod.rs

//! Session lifecycle and the submit gate.
//!
//! A [`SessionController`] is created once per remote session. It owns
//! the idle watchdog (running from `start` until `delete`), the
//! session's executor differ and application record, and runs one
//! [`Reconciler`] per submitted statement.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::RemoteExecutionClient;
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::errors::{MonitorError, Result};
use crate::events::{ApplicationEnd, EventBody, EventSink, SparkEvent};
use crate::keeper::{IdleWatchdog, KeeperHandle, KeeperTelemetry, SessionShared};
use crate::reconcile::{
    ApplicationState, ExecutorDiffer, OutputSink, ReconcileOptions, Reconciler,
    StatementContext, StatementResult,
};
use crate::types::{SessionId, SessionStatus, StatementId};

/// A statement already submitted to the remote session, to be monitored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    pub statement_id: StatementId,
    pub cell_guid: String,
    /// Defaults to the statement id.
    pub job_group: Option<String>,
}

impl StatementRequest {
    pub fn new(statement_id: StatementId, cell_guid: impl Into<String>) -> Self {
        Self {
            statement_id,
            cell_guid: cell_guid.into(),
            job_group: None,
        }
    }

    pub fn with_job_group(mut self, job_group: impl Into<String>) -> Self {
        self.job_group = Some(job_group.into());
        self
    }
}

pub struct SessionController<C: ?Sized, S: ?Sized> {
    session_id: SessionId,
    guid: String,
    client: Arc<C>,
    sink: Arc<S>,
    output: Option<Arc<dyn OutputSink>>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    shared: Arc<SessionShared>,
    keeper: KeeperHandle,
    app: ApplicationState,
    executors: ExecutorDiffer,
    deleted: bool,
}

impl<C, S> SessionController<C, S>
where
    C: RemoteExecutionClient + ?Sized + 'static,
    S: EventSink + ?Sized,
{
    /// Attach to `session_id` and start its idle watchdog.
    pub async fn start(
        session_id: SessionId,
        client: Arc<C>,
        sink: Arc<S>,
        config: MonitorConfig,
    ) -> Result<Self> {
        let status = client.get_session(session_id).await?.status()?;
        let guid = Uuid::new_v4().to_string();
        let shared = Arc::new(SessionShared::new(status));

        let keeper = IdleWatchdog::new(
            Arc::clone(&client),
            session_id,
            guid.clone(),
            Arc::clone(&shared),
            config.keeper_interval(),
            config.session_timeout(),
        )
        .spawn();

        info!(session_id, %guid, %status, "session attached");

        Ok(Self {
            session_id,
            guid,
            client,
            sink,
            output: None,
            clock: Arc::new(SystemClock),
            config,
            shared,
            keeper,
            app: ApplicationState::default(),
            executors: ExecutorDiffer::new(),
            deleted: false,
        })
    }

    /// Where finished statement results are displayed.
    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    pub fn shared(&self) -> Arc<SessionShared> {
        Arc::clone(&self.shared)
    }

    pub fn application(&self) -> &ApplicationState {
        &self.app
    }

    pub fn executors(&self) -> &ExecutorDiffer {
        &self.executors
    }

    pub fn telemetry(&self) -> watch::Receiver<KeeperTelemetry> {
        self.keeper.telemetry()
    }

    /// False once the session is terminal, timed out or deleted.
    pub fn can_submit(&self) -> bool {
        !self.deleted && self.shared.can_submit()
    }

    /// Monitor `request` until it and all of its jobs are done.
    ///
    /// Takes `&mut self`: one statement is monitored at a time per
    /// session.
    pub async fn submit(
        &mut self,
        request: StatementRequest,
        cancel: &CancellationToken,
    ) -> Result<StatementResult> {
        if !self.can_submit() {
            let status = self.shared.status();
            warn!(session_id = self.session_id, %status, "submit refused");
            return Err(MonitorError::SessionUnavailable(status));
        }

        let mut ctx = StatementContext::new(self.session_id, request.statement_id, request.cell_guid);
        if let Some(job_group) = request.job_group {
            ctx = ctx.with_job_group(job_group);
        }

        let result = Reconciler::new(
            self.client.as_ref(),
            self.sink.as_ref(),
            ctx,
            &mut self.app,
            &mut self.executors,
        )
        .with_clock(self.clock.as_ref())
        .with_options(ReconcileOptions::from(&self.config))
        .run(cancel)
        .await?;

        if let Some(output) = &self.output {
            result.render(output.as_ref());
        }
        Ok(result)
    }

    /// Driver log lines starting at `from`. Empty when the log cannot be
    /// fetched.
    pub async fn fetch_logs(&self, from: u32) -> Vec<String> {
        match self
            .client
            .get_session_log(self.session_id, from, self.config.log_batch_size())
            .await
        {
            Ok(lines) => lines,
            Err(err) => {
                warn!(session_id = self.session_id, error = %err, "session log unavailable");
                Vec::new()
            }
        }
    }

    /// Stop the watchdog and announce the application's end. Safe to call
    /// more than once.
    pub async fn delete(&mut self) {
        if self.deleted {
            debug!(session_id = self.session_id, "session already deleted");
            return;
        }
        self.deleted = true;

        match self.keeper.stop().await {
            Ok(exit) => debug!(session_id = self.session_id, ?exit, "idle watchdog joined"),
            Err(err) => warn!(session_id = self.session_id, error = %err, "idle watchdog ended with error"),
        }

        if let Some(app_id) = self.app.take_for_end() {
            let body = EventBody::ApplicationEnd(ApplicationEnd {
                app_id,
                end_time: self.clock.now_ms(),
            });
            self.sink.publish(SparkEvent::new(self.guid.clone(), body));
        }

        info!(session_id = self.session_id, "session deleted");
    }
}
