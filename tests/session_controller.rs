// tests/session_controller.rs

mod common;
use crate::common::{APP, SESSION, init_tracing};

use std::sync::Arc;

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use sparkmon::config::{MonitorConfig, RawMonitorConfig};
use sparkmon::errors::MonitorError;
use sparkmon::events::EventBody;
use sparkmon::reconcile::StatementResult;
use sparkmon::session::{SessionController, StatementRequest};
use sparkmon::types::SessionStatus;
use sparkmon_test_utils::builders::ok_output;
use sparkmon_test_utils::{
    Displayed, Frame, ManualClock, RecordingOutput, RecordingSink, ScriptedClient, SessionStep,
    with_timeout,
};

type Controller = SessionController<ScriptedClient, RecordingSink>;

fn config(raw: RawMonitorConfig) -> MonitorConfig {
    MonitorConfig::try_from(raw).unwrap()
}

fn fast_config() -> MonitorConfig {
    config(RawMonitorConfig {
        poll_interval_ms: 10,
        ..RawMonitorConfig::default()
    })
}

async fn start(client: ScriptedClient, cfg: MonitorConfig) -> (Arc<ScriptedClient>, Arc<RecordingSink>, Controller) {
    let client = Arc::new(client);
    let sink = Arc::new(RecordingSink::new());
    let controller = SessionController::start(SESSION, Arc::clone(&client), Arc::clone(&sink), cfg)
        .await
        .unwrap()
        .with_clock(Arc::new(ManualClock::default()));
    (client, sink, controller)
}

#[tokio::test(start_paused = true)]
async fn submit_renders_the_result_and_announces_the_application_once() {
    init_tracing();
    let frames = vec![Frame::available(Some(ok_output("text/plain", "done"))).app(APP)];
    let (_client, sink, controller) = start(ScriptedClient::new(frames), fast_config()).await;
    let output = Arc::new(RecordingOutput::new());
    let mut controller = controller.with_output(output.clone());
    let cancel = CancellationToken::new();

    let first = with_timeout(controller.submit(StatementRequest::new(7, "cell-a"), &cancel))
        .await
        .unwrap();
    let second = with_timeout(controller.submit(
        StatementRequest::new(8, "cell-b").with_job_group("etl"),
        &cancel,
    ))
    .await
    .unwrap();

    assert_eq!(first, StatementResult::Text("done".into()));
    assert_eq!(second, StatementResult::Text("done".into()));
    assert_eq!(
        output.shown(),
        vec![Displayed::Text("done".into()), Displayed::Text("done".into())]
    );

    assert_eq!(sink.count(EventBody::APPLICATION_START), 1);
    assert_eq!(sink.count(EventBody::JOB_RECEIVED), 2);
    assert_eq!(controller.application().app_id(), Some(APP));

    let received: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e.body {
            EventBody::JobReceived(r) => Some((e.cell_guid, r.statement_id, r.job_group)),
            _ => None,
        })
        .collect();
    assert_eq!(
        received,
        vec![
            ("cell-a".to_string(), 7, "7".to_string()),
            ("cell-b".to_string(), 8, "etl".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn delete_ends_the_application_once_and_closes_the_gate() {
    init_tracing();
    let frames = vec![Frame::available(None).app(APP)];
    let (_client, sink, mut controller) = start(ScriptedClient::new(frames), fast_config()).await;
    let cancel = CancellationToken::new();

    let result = with_timeout(controller.submit(StatementRequest::new(7, "cell-a"), &cancel))
        .await
        .unwrap();
    assert_eq!(result, StatementResult::NoOutput);
    assert!(controller.can_submit());

    controller.delete().await;
    controller.delete().await;

    assert_eq!(sink.count(EventBody::APPLICATION_END), 1);
    let end = sink.events().into_iter().last().unwrap();
    assert_eq!(end.cell_guid, controller.guid());
    match end.body {
        EventBody::ApplicationEnd(e) => {
            assert_eq!(e.app_id, APP);
            assert_eq!(e.end_time, 1_700_000_000_000);
        }
        other => panic!("expected ApplicationEnd, got {other:?}"),
    }

    assert!(!controller.can_submit());
    let err = controller
        .submit(StatementRequest::new(8, "cell-b"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::SessionUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn delete_without_an_application_publishes_nothing() {
    init_tracing();
    let (_client, sink, mut controller) =
        start(ScriptedClient::new(vec![Frame::running()]), fast_config()).await;

    controller.delete().await;

    assert!(sink.is_empty());
    assert!(!controller.can_submit());
}

#[tokio::test(start_paused = true)]
async fn terminal_session_refuses_submissions() {
    init_tracing();
    let client = ScriptedClient::new(vec![Frame::running()])
        .with_session_script(vec![SessionStep::state("dead")]);
    let (client, sink, mut controller) = start(client, fast_config()).await;

    assert_eq!(controller.status(), SessionStatus::Dead);
    assert!(!controller.can_submit());

    let err = controller
        .submit(StatementRequest::new(7, "cell-a"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::SessionUnavailable(SessionStatus::Dead)));
    assert_eq!(client.call_count("get_statement"), 0);
    assert!(sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_session_status_fails_start() {
    init_tracing();
    let client = Arc::new(
        ScriptedClient::new(vec![Frame::running()])
            .with_session_script(vec![SessionStep::state("melting")]),
    );
    let sink = Arc::new(RecordingSink::new());

    let err = SessionController::start(SESSION, client, sink, fast_config())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, MonitorError::UnexpectedStatus(_)));
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_closes_the_gate() {
    init_tracing();
    let cfg = config(RawMonitorConfig {
        poll_interval_ms: 10,
        keeper_interval_secs: 1,
        session_timeout_secs: 2,
        ..RawMonitorConfig::default()
    });
    let (_client, _sink, mut controller) =
        start(ScriptedClient::new(vec![Frame::running()]), cfg).await;
    assert!(controller.can_submit());

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(controller.status(), SessionStatus::Timeout);
    assert!(controller.telemetry().borrow().timed_out);
    assert!(!controller.can_submit());

    let err = controller
        .submit(StatementRequest::new(7, "cell-a"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::SessionUnavailable(SessionStatus::Timeout)));

    controller.delete().await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_submit_leaves_the_session_usable() {
    init_tracing();
    let frames = vec![Frame::running().app(APP)];
    let (_client, _sink, mut controller) = start(ScriptedClient::new(frames), fast_config()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = with_timeout(controller.submit(StatementRequest::new(7, "cell-a"), &cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::Cancelled));
    assert!(controller.can_submit());
}

#[tokio::test(start_paused = true)]
async fn fetch_logs_pages_by_batch_size() {
    init_tracing();
    let cfg = config(RawMonitorConfig {
        log_batch_size: 2,
        ..RawMonitorConfig::default()
    });
    let lines: Vec<String> = (1..=5).map(|i| format!("line {i}")).collect();
    let (_client, _sink, controller) =
        start(ScriptedClient::new(vec![Frame::running()]).with_logs(lines), cfg).await;

    assert_eq!(controller.fetch_logs(0).await, vec!["line 1", "line 2"]);
    assert_eq!(controller.fetch_logs(4).await, vec!["line 5"]);
    assert!(controller.fetch_logs(5).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_logs_falls_back_to_empty_on_failure() {
    init_tracing();
    let (client, _sink, controller) =
        start(ScriptedClient::new(vec![Frame::running()]), fast_config()).await;

    assert!(controller.fetch_logs(0).await.is_empty());
    assert_eq!(client.call_count("get_session_log"), 1);
}
