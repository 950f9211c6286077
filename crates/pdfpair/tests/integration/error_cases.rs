//! Integration tests for run-fatal and non-fatal failure paths.

use pdfpair::{
    EventEmitter, LopdfBackend, MergeOrchestrator, PdfPairError, RootRole, RunEvent, RunOutcome,
    SecondaryMode,
};

use crate::common::Workspace;

#[test]
fn test_missing_primary_root() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.primary_root = ws.root().join("does-not-exist");

    let err = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PdfPairError::DirectoryNotFound {
            role: RootRole::Primary,
            ..
        }
    ));
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), 2);
    assert!(!ws.output().exists());
}

#[test]
fn test_primary_root_is_a_file() {
    let ws = Workspace::new();
    let file = crate::common::write_pdf(&ws.root().join("single.pdf"), 100, 1);
    let mut config = ws.config();
    config.primary_root = file;

    let err = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap_err();
    assert!(matches!(err, PdfPairError::DirectoryNotFound { .. }));
}

#[test]
fn test_missing_secondary_root() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    let mut config = ws.config();
    config.secondary_root = Some(ws.root().join("nowhere"));

    let err = MergeOrchestrator::new(config.clone(), LopdfBackend::new())
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        PdfPairError::DirectoryNotFound {
            role: RootRole::Secondary,
            ..
        }
    ));

    config.secondary_mode = SecondaryMode::Optional;
    let summary = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::NoPairs);
    assert_eq!(summary.unused_primary.len(), 1);
}

#[test]
fn test_no_pairs_reports_without_creating_output() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("b_1.pdf", 101, 1);

    let (events, mut rx) = EventEmitter::channel();
    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .with_events(events)
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::NoPairs);
    assert_eq!(summary.counters.merged_groups, 0);
    assert_eq!(summary.counters.skipped_primary_no_pair, 1);
    assert_eq!(summary.counters.skipped_secondary_no_pair, 1);
    assert!(!ws.output().exists());

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(last, Some(RunEvent::Finished { success: false, .. })));
}

#[test]
fn test_empty_roots() {
    let ws = Workspace::new();
    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::NoPairs);
    assert_eq!(summary.groups_total, 0);
}

#[test]
fn test_output_folder_cannot_be_created() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);
    std::fs::write(ws.output(), b"a file, not a folder").unwrap();

    let err = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap_err();
    assert!(matches!(err, PdfPairError::OutputCreationFailed { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_concurrent_run_is_refused() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);
    std::fs::create_dir_all(ws.output()).unwrap();
    let held = pdfpair::lock::OutputLock::acquire(&ws.output()).unwrap();

    let err = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap_err();
    assert!(matches!(err, PdfPairError::OutputLocked { .. }));
    assert!(!ws.output().join("a.pdf").exists());

    drop(held);
    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();
    assert_eq!(summary.counters.merged_groups, 1);
}

#[test]
fn test_invalid_config_is_fatal() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.output_dir_name = "nested/name".to_string();

    let err = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap_err();
    assert!(matches!(err, PdfPairError::InvalidConfig { .. }));
}
