// tests/integration/result_handling.rs

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use sparkmon::client::model::StatementOutput;
use sparkmon::config::from_toml_str;
use sparkmon::errors::MonitorError;
use sparkmon::events::JsonLinesSink;
use sparkmon::reconcile::result::interpret;
use sparkmon::reconcile::{
    ApplicationState, ExecutorDiffer, ReconcileOptions, Reconciler, StatementContext,
    StatementResult,
};
use sparkmon::types::JobStatus;
use sparkmon_test_utils::builders::{JobBuilder, error_output, ok_output};
use sparkmon_test_utils::{Displayed, Frame, ManualClock, RecordingOutput, ScriptedClient};

fn ok_with(entries: &[(&str, Value)]) -> StatementOutput {
    StatementOutput {
        status: "ok".into(),
        data: entries
            .iter()
            .map(|(mime, value)| (mime.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
        ..StatementOutput::default()
    }
}

#[test]
fn image_payload_is_decoded_ignoring_line_breaks() {
    let output = ok_output("image/png", "iVBO\nRw==");

    let result = interpret(Some(&output)).unwrap();

    assert_eq!(
        result,
        StatementResult::Image {
            mime: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4E, 0x47],
        }
    );
}

#[test]
fn image_wins_over_html_and_html_over_text() {
    let all = ok_with(&[
        ("text/plain", json!("plain")),
        ("text/html", json!("<p>rich</p>")),
        ("image/png", json!("iVBORw==")),
    ]);
    assert!(matches!(
        interpret(Some(&all)).unwrap(),
        StatementResult::Image { .. }
    ));

    let no_image = ok_with(&[
        ("text/plain", json!("plain")),
        ("text/html", json!("<p>rich</p>")),
    ]);
    assert_eq!(
        interpret(Some(&no_image)).unwrap(),
        StatementResult::Html("<p>rich</p>".into())
    );
}

#[test]
fn corrupt_image_is_invalid_output() {
    let output = ok_output("image/jpeg", "not base64!");

    let err = interpret(Some(&output)).unwrap_err();
    assert!(matches!(err, MonitorError::InvalidOutput(_)));
}

#[test]
fn error_output_carries_the_joined_traceback() {
    let output = error_output("division by zero", &["Traceback:\n", "  line 1\n"]);

    match interpret(Some(&output)).unwrap_err() {
        MonitorError::StatementExecution { evalue, traceback } => {
            assert_eq!(evalue, "division by zero");
            assert_eq!(traceback, "Traceback:\n  line 1\n");
        }
        other => panic!("expected StatementExecution, got {other:?}"),
    }
}

#[test]
fn results_render_to_the_matching_display_call() {
    let out = RecordingOutput::new();

    StatementResult::Text("42".into()).render(&out);
    StatementResult::Html("<b>x</b>".into()).render(&out);
    StatementResult::Image {
        mime: "image/png".into(),
        bytes: vec![1, 2],
    }
    .render(&out);
    StatementResult::NoOutput.render(&out);

    assert_eq!(
        out.shown(),
        vec![
            Displayed::Text("42".into()),
            Displayed::Html("<b>x</b>".into()),
            Displayed::Image {
                mime: "image/png".into(),
                bytes: vec![1, 2],
            },
        ]
    );
}

#[test]
fn config_is_read_from_a_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
poll_interval_ms = 250
session_timeout_secs = 600
"#
    )
    .unwrap();

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let cfg = from_toml_str(&contents).unwrap();

    let options = ReconcileOptions::from(&cfg);
    assert_eq!(options.poll_interval.as_millis(), 250);
    assert_eq!(cfg.session_timeout().as_secs(), 600);
}

#[tokio::test(start_paused = true)]
async fn reconciler_events_are_written_as_json_lines() {
    sparkmon_test_utils::init_tracing();
    let app = "application_1700000000000_0001";
    let client = ScriptedClient::new(vec![
        Frame::running()
            .app(app)
            .job(JobBuilder::new(1, "7").submitted(900).build()),
        Frame::available(Some(ok_output("text/plain", "3")))
            .app(app)
            .job(
                JobBuilder::new(1, "7")
                    .status(JobStatus::Succeeded)
                    .submitted(900)
                    .completed(950)
                    .build(),
            ),
    ]);
    let file = NamedTempFile::new().unwrap();
    let sink = JsonLinesSink::new(file.reopen().unwrap());
    let clock = ManualClock::default();
    let mut app_state = ApplicationState::default();
    let mut executors = ExecutorDiffer::new();

    let result = sparkmon_test_utils::with_timeout(
        Reconciler::new(
            &client,
            &sink,
            StatementContext::new(3, 7, "cell-json"),
            &mut app_state,
            &mut executors,
        )
        .with_clock(&clock)
        .run(&CancellationToken::new()),
    )
    .await
    .unwrap();
    drop(sink);

    assert_eq!(result, StatementResult::Text("3".into()));

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let kinds: Vec<&str> = lines.iter().map(|l| l["msgtype"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec![
            "sparkJobReceived",
            "sparkApplicationStart",
            "sparkJobStart",
            "sparkJobEnd",
        ]
    );
    assert!(lines.iter().all(|l| l["cellGuid"] == "cell-json"));
    assert_eq!(lines[1]["appId"], app);
    assert_eq!(lines[3]["status"], "SUCCEEDED");
}
