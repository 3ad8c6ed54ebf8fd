use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use sparkmon::client::{
    ApplicationInfo, ClientFuture, ExecutorSummary, JobSnapshot, RemoteExecutionClient,
    SessionSnapshot, StageAttempt, StatementOutput, StatementSnapshot,
};
use sparkmon::errors::MonitorError;
use sparkmon::types::{AttemptId, JobId, SessionId, StageId, StatementId};

/// What the remote side reports during one reconciler cycle.
#[derive(Debug, Clone)]
pub struct Frame {
    pub statement_state: String,
    pub output: Option<StatementOutput>,
    pub app_id: Option<String>,
    pub jobs: Vec<JobSnapshot>,
    pub stages: BTreeMap<StageId, Vec<StageAttempt>>,
    pub executors: Option<Vec<ExecutorSummary>>,
    /// `get_statement` fails with a transport error in this frame.
    pub fail_statement: bool,
}

impl Frame {
    pub fn running() -> Self {
        Self {
            statement_state: "running".into(),
            output: None,
            app_id: None,
            jobs: Vec::new(),
            stages: BTreeMap::new(),
            executors: None,
            fail_statement: false,
        }
    }

    pub fn available(output: Option<StatementOutput>) -> Self {
        Self {
            statement_state: "available".into(),
            output,
            ..Self::running()
        }
    }

    pub fn state(mut self, state: &str) -> Self {
        self.statement_state = state.to_string();
        self
    }

    pub fn app(mut self, app_id: &str) -> Self {
        self.app_id = Some(app_id.to_string());
        self
    }

    pub fn job(mut self, job: JobSnapshot) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn stage(mut self, attempt: StageAttempt) -> Self {
        self.stages.entry(attempt.stage_id).or_default().push(attempt);
        self
    }

    pub fn executors(mut self, executors: Vec<ExecutorSummary>) -> Self {
        self.executors = Some(executors);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_statement = true;
        self
    }
}

/// One `get_session` answer for the watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    State(String),
    Fail,
}

impl SessionStep {
    pub fn state(state: &str) -> Self {
        SessionStep::State(state.to_string())
    }
}

/// Fake [`RemoteExecutionClient`] replaying a fixed script.
///
/// Every `get_statement` call advances to the next [`Frame`]; all other
/// queries answer from the current frame. The last frame repeats
/// forever.
///
/// `get_session` answers from the session script when one is set (the
/// last step repeats), otherwise it reports `idle`. The app id always
/// comes from the current frame.
#[derive(Debug)]
pub struct ScriptedClient {
    frames: Vec<Frame>,
    next_frame: AtomicUsize,
    current: AtomicUsize,
    session_steps: Mutex<VecDeque<SessionStep>>,
    application: Option<ApplicationInfo>,
    logs: Option<Vec<String>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedClient {
    pub fn new(frames: Vec<Frame>) -> Self {
        assert!(!frames.is_empty(), "a script needs at least one frame");
        Self {
            frames,
            next_frame: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            session_steps: Mutex::new(VecDeque::new()),
            application: None,
            logs: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_session_script(self, steps: Vec<SessionStep>) -> Self {
        *self.session_steps.lock().unwrap() = steps.into();
        self
    }

    pub fn with_application(mut self, info: ApplicationInfo) -> Self {
        self.application = Some(info);
        self
    }

    /// Without logs, `get_session_log` fails.
    pub fn with_logs(mut self, lines: Vec<String>) -> Self {
        self.logs = Some(lines);
        self
    }

    /// Names of the client methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().into_iter().filter(|m| *m == method).count()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }

    fn frame(&self) -> &Frame {
        let idx = self.current.load(Ordering::SeqCst);
        &self.frames[idx.min(self.frames.len() - 1)]
    }

    fn missing(what: String) -> MonitorError {
        MonitorError::transport(anyhow::anyhow!("404: {what} not found"))
    }
}

impl RemoteExecutionClient for ScriptedClient {
    fn get_statement(
        &self,
        _session: SessionId,
        statement: StatementId,
    ) -> ClientFuture<'_, StatementSnapshot> {
        self.record("get_statement");
        let idx = self.next_frame.fetch_add(1, Ordering::SeqCst);
        let idx = idx.min(self.frames.len() - 1);
        self.current.store(idx, Ordering::SeqCst);

        let frame = self.frame();
        let result = if frame.fail_statement {
            Err(MonitorError::transport(anyhow::anyhow!("connection reset")))
        } else {
            Ok(StatementSnapshot {
                id: statement,
                state: frame.statement_state.clone(),
                output: frame.output.clone(),
            })
        };
        Box::pin(async move { result })
    }

    fn get_session(&self, _session: SessionId) -> ClientFuture<'_, SessionSnapshot> {
        self.record("get_session");
        let step = {
            let mut steps = self.session_steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };

        let result = match step {
            Some(SessionStep::Fail) => {
                Err(MonitorError::transport(anyhow::anyhow!("session poll failed")))
            }
            Some(SessionStep::State(state)) => Ok(SessionSnapshot {
                state,
                app_id: self.frame().app_id.clone(),
            }),
            None => Ok(SessionSnapshot {
                state: "idle".into(),
                app_id: self.frame().app_id.clone(),
            }),
        };
        Box::pin(async move { result })
    }

    fn get_executors<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<ExecutorSummary>>> {
        self.record("get_executors");
        let result = self.frame().executors.clone();
        Box::pin(async move { Ok(result) })
    }

    fn get_jobs<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<JobSnapshot>>> {
        self.record("get_jobs");
        let jobs = &self.frame().jobs;
        let result = (!jobs.is_empty()).then(|| jobs.clone());
        Box::pin(async move { Ok(result) })
    }

    fn get_job_by_id<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
        job: JobId,
    ) -> ClientFuture<'a, JobSnapshot> {
        self.record("get_job_by_id");
        let result = self
            .frame()
            .jobs
            .iter()
            .find(|j| j.job_id == job)
            .cloned()
            .ok_or_else(|| Self::missing(format!("job {job}")));
        Box::pin(async move { result })
    }

    fn get_stages<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<StageAttempt>>> {
        self.record("get_stages");
        let all: Vec<StageAttempt> = self.frame().stages.values().flatten().cloned().collect();
        let result = (!all.is_empty()).then_some(all);
        Box::pin(async move { Ok(result) })
    }

    fn get_stage_by_id<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
        stage: StageId,
    ) -> ClientFuture<'a, Option<Vec<StageAttempt>>> {
        self.record("get_stage_by_id");
        let result = self.frame().stages.get(&stage).cloned();
        Box::pin(async move { Ok(result) })
    }

    fn get_stage_attempt_by_id<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
        stage: StageId,
        attempt: AttemptId,
    ) -> ClientFuture<'a, StageAttempt> {
        self.record("get_stage_attempt_by_id");
        let result = self
            .frame()
            .stages
            .get(&stage)
            .and_then(|attempts| attempts.iter().find(|a| a.attempt_id == attempt))
            .cloned()
            .ok_or_else(|| Self::missing(format!("stage {stage}.{attempt}")));
        Box::pin(async move { result })
    }

    fn get_application<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
    ) -> ClientFuture<'a, Option<ApplicationInfo>> {
        self.record("get_application");
        let result = self.application.clone();
        Box::pin(async move { Ok(result) })
    }

    fn get_session_log(
        &self,
        _session: SessionId,
        from: u32,
        size: u32,
    ) -> ClientFuture<'_, Vec<String>> {
        self.record("get_session_log");
        let result = match &self.logs {
            Some(lines) => Ok(lines
                .iter()
                .skip(from as usize)
                .take(size as usize)
                .cloned()
                .collect()),
            None => Err(MonitorError::transport(anyhow::anyhow!("log endpoint down"))),
        };
        Box::pin(async move { result })
    }
}
