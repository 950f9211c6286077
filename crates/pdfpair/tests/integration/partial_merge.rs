//! Integration tests for unreadable inputs inside groups.

use pdfpair::{LopdfBackend, MergeOrchestrator, RootRole, RunOutcome};

use crate::common::{Workspace, listing, page_widths};

#[test]
fn test_unreadable_member_is_left_out() {
    let ws = Workspace::new();
    ws.add_primary("P.pdf", 100, 1);
    ws.add_secondary("P_1.pdf", 101, 1);
    ws.add_garbage(ws.secondary().join("P_2.pdf"));
    ws.add_secondary("P_3.pdf", 103, 1);

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_secondary_corrupt, 1);
    assert_eq!(summary.failed_secondary.len(), 1);
    assert!(summary.failed_secondary[0].path.ends_with("P_2.pdf"));
    assert_eq!(summary.failed_secondary[0].role, RootRole::Secondary);

    assert_eq!(page_widths(&ws.output().join("P.pdf")), vec![100, 101, 103]);
}

#[test]
fn test_unreadable_primary_skips_only_its_group() {
    let ws = Workspace::new();
    ws.add_garbage(ws.primary().join("broken.pdf"));
    ws.add_secondary("broken_1.pdf", 201, 1);
    ws.add_primary("fine.pdf", 100, 1);
    ws.add_secondary("fine_1.pdf", 101, 1);

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.groups_total, 2);
    assert_eq!(summary.groups_processed, 2);
    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_primary_corrupt, 1);
    assert!(summary.failed_primary[0].path.ends_with("broken.pdf"));

    assert_eq!(listing(&ws.output()), vec!["fine.pdf"]);
    assert_eq!(page_widths(&ws.output().join("fine.pdf")), vec![100, 101]);
}

#[test]
fn test_group_with_only_unreadable_members_keeps_primary() {
    let ws = Workspace::new();
    ws.add_primary("solo.pdf", 100, 2);
    ws.add_garbage(ws.secondary().join("solo_1.pdf"));

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_secondary_corrupt, 1);
    assert_eq!(page_widths(&ws.output().join("solo.pdf")), vec![100, 100]);
}

#[test]
fn test_empty_pdf_file_counts_as_unreadable() {
    let ws = Workspace::new();
    ws.add_primary("doc.pdf", 100, 1);
    std::fs::write(ws.secondary().join("doc_1.pdf"), b"").unwrap();

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.counters.skipped_secondary_corrupt, 1);
    assert_eq!(summary.counters.merged_groups, 1);
}
