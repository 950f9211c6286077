//! Integration tests for grouping and ordering on real files.

use pdfpair::{LopdfBackend, MergeOrchestrator, RunOutcome};

use crate::common::{Workspace, listing, page_widths};

#[test]
fn test_numbered_members_follow_primary_in_order() {
    let ws = Workspace::new();
    ws.add_primary("Report.pdf", 100, 1);
    ws.add_secondary("Report (2).pdf", 202, 1);
    ws.add_secondary("report.pdf", 200, 1);
    ws.add_secondary("Report (1).pdf", 201, 2);
    ws.add_secondary("Other_1.pdf", 300, 1);

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .expect("run failed");

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_secondary_no_pair, 1);
    assert_eq!(summary.output_dir.as_deref(), Some(ws.output().as_path()));

    let merged = ws.output().join("Report.pdf");
    assert_eq!(page_widths(&merged), vec![100, 201, 201, 202, 200]);
    assert_eq!(listing(&ws.output()), vec!["Report.pdf"]);
}

#[test]
fn test_subfolders_are_flattened() {
    let ws = Workspace::new();
    ws.add_primary("2024/q1/Invoice_7.pdf", 110, 1);
    ws.add_secondary("archive/deep/invoice 3.pdf", 130, 1);
    ws.add_secondary("invoice_1.pdf", 120, 1);

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.groups.len(), 1);
    assert_eq!(summary.groups[0].prefix, "invoice");
    assert_eq!(listing(&ws.output()), vec!["Invoice_7.pdf"]);
    assert_eq!(
        page_widths(&ws.output().join("Invoice_7.pdf")),
        vec![110, 120, 130]
    );
}

#[test]
fn test_extension_is_case_insensitive_and_other_files_ignored() {
    let ws = Workspace::new();
    ws.add_primary("Scan.PDF", 100, 1);
    ws.add_secondary("scan_1.Pdf", 101, 1);
    std::fs::write(ws.primary().join("notes.txt"), b"not a pdf").unwrap();
    std::fs::write(ws.secondary().join("scan_2.pdf.bak"), b"backup").unwrap();

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.groups[0].members.len(), 1);
    assert_eq!(page_widths(&ws.output().join("Scan.PDF")), vec![100, 101]);
}

#[test]
fn test_groups_are_processed_in_prefix_order() {
    let ws = Workspace::new();
    for (name, width) in [("charlie.pdf", 3), ("alpha.pdf", 1), ("bravo.pdf", 2)] {
        ws.add_primary(name, width, 1);
        ws.add_secondary(&name.replace(".pdf", "_1.pdf"), width + 10, 1);
    }

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    let prefixes: Vec<&str> = summary.groups.iter().map(|g| g.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["alpha", "bravo", "charlie"]);
    let outputs: Vec<String> = summary
        .outputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(outputs, vec!["alpha.pdf", "bravo.pdf", "charlie.pdf"]);
}

#[test]
fn test_rerun_overwrites_and_reuses_output_folder() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);

    MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();
    let first = listing(&ws.output());

    let summary = MergeOrchestrator::new(ws.config(), LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(listing(&ws.output()), first);
    assert_eq!(page_widths(&ws.output().join("a.pdf")), vec![100, 101]);
}

#[test]
fn test_output_folder_inside_primary_is_not_rescanned() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.primary());

    let first = MergeOrchestrator::new(config.clone(), LopdfBackend::new())
        .run()
        .unwrap();
    let second = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(first.counters, second.counters);
    assert!(second.unused_primary.is_empty());
}

#[test]
fn test_same_tree_never_appends_primary_to_itself() {
    let ws = Workspace::new();
    ws.add_primary("A.pdf", 100, 1);
    ws.add_primary("A (1).pdf", 101, 1);
    ws.add_primary("lonely.pdf", 102, 1);

    let mut config = ws.config();
    config.secondary_root = Some(ws.primary());

    let summary = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.groups.len(), 1);
    assert_eq!(page_widths(&ws.output().join("A.pdf")), vec![100, 101]);
    assert_eq!(summary.unused_primary.len(), 1);
    assert_eq!(summary.unused_secondary.len(), 1);
}

#[test]
fn test_dry_run_plans_without_writing() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);

    let mut config = ws.config();
    config.dry_run = true;
    let summary = MergeOrchestrator::new(config, LopdfBackend::new())
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::DryRun);
    assert_eq!(summary.groups_total, 1);
    assert!(!ws.output().exists());
    assert!(ws.root().join("primary/a.pdf").exists());
}
