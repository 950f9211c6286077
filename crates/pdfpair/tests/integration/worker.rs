//! Integration tests for running on a worker and the event stream.

use pdfpair::{
    CancellationToken, EventEmitter, RunEvent, RunOutcome, Severity, run_blocking, spawn_run,
};

use crate::common::{Workspace, page_widths};

fn three_groups() -> Workspace {
    let ws = Workspace::new();
    for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
        let width = 100 + i as i64;
        ws.add_primary(&format!("{name}.pdf"), width, 1);
        ws.add_secondary(&format!("{name}_1.pdf"), width + 10, 1);
    }
    ws
}

#[tokio::test]
async fn test_events_stream_until_finished() {
    let ws = three_groups();
    let mut handle = spawn_run(ws.config());

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let summary = handle.wait().await.expect("run failed");

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.counters.merged_groups, 3);

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![33, 66, 100]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    assert!(
        events
            .iter()
            .any(|e| matches!(e, RunEvent::Status { .. }))
    );
    match events.last() {
        Some(RunEvent::Finished {
            success,
            output_dir,
            ..
        }) => {
            assert!(success);
            assert_eq!(output_dir.as_deref(), Some(ws.output().as_path()));
        }
        other => panic!("expected Finished last, got {other:?}"),
    }
    let finished = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 1);
}

#[tokio::test]
async fn test_fatal_error_is_returned_from_wait() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.primary_root = ws.root().join("gone");

    let mut handle = spawn_run(config);
    let mut errors = 0;
    while let Some(event) = handle.next_event().await {
        if let RunEvent::Log {
            severity: Severity::Error,
            ..
        } = event
        {
            errors += 1;
        }
    }

    let err = handle.wait().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(errors >= 1);
}

#[tokio::test]
async fn test_wait_without_reading_events() {
    let ws = three_groups();
    let handle = spawn_run(ws.config());
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.counters.merged_groups, 3);
}

#[test]
fn test_cancelled_run_stops_between_groups() {
    let ws = three_groups();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (events, mut rx) = EventEmitter::channel();
    let summary = run_blocking(ws.config(), events, cancel).unwrap();

    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert_eq!(summary.groups_processed, 0);
    assert!(!summary.is_success());

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(last, Some(RunEvent::Finished { success: false, .. })));
}

#[tokio::test]
async fn test_cancel_token_from_handle() {
    let ws = three_groups();
    let handle = spawn_run(ws.config());
    handle.cancel();
    let summary = handle.wait().await.unwrap();

    // The worker may finish before it sees the request; either way every
    // group it started is complete on disk.
    assert!(matches!(
        summary.outcome,
        RunOutcome::Cancelled | RunOutcome::Completed
    ));
    for output in &summary.outputs {
        assert_eq!(page_widths(output).len(), 2);
    }
    assert_eq!(summary.outputs.len(), summary.counters.merged_groups);
}
