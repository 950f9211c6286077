//! Integration tests for the external tool backend, using a shell script that
//! records its arguments instead of merging.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pdfpair::{
    BackendKind, CancellationToken, CommandBackend, EventEmitter, MergeOrchestrator,
    PdfPairError, RunOutcome, run_blocking,
};

use crate::common::{Workspace, listing};

/// Writes its argument list to the path after `output`. Fails for outputs
/// whose name contains "reject" and hangs for those containing "stall".
const RECORDER: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "output" ]; then out="$arg"; fi
    prev="$arg"
done
case "$out" in
    *reject*) echo "refusing $out" >&2; exit 1 ;;
    *stall*) sleep 30 ;;
esac
printf '%s\n' "$@" > "$out"
"#;

fn install_tool(dir: &Path) -> PathBuf {
    let tool = dir.join("fake-pdftk");
    fs::write(&tool, RECORDER).unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
    tool
}

fn recorded_args(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            Path::new(line)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| line.to_string())
        })
        .collect()
}

#[test]
fn test_tool_receives_pdftk_arguments() {
    let ws = Workspace::new();
    let tool = install_tool(ws.root());
    ws.add_primary("deed.pdf", 100, 1);
    ws.add_secondary("deed (2).pdf", 102, 1);
    ws.add_secondary("deed (1).pdf", 101, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.root().to_path_buf());
    config.backend = BackendKind::Command {
        program: tool.clone(),
    };

    let summary = MergeOrchestrator::new(config, CommandBackend::new(tool))
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(
        recorded_args(&ws.output().join("deed.pdf")),
        vec!["deed.pdf", "deed (1).pdf", "deed (2).pdf", "cat", "output", ".deed.pdf.tmp"]
    );
}

#[test]
fn test_tool_failure_skips_group_only() {
    let ws = Workspace::new();
    let tool = install_tool(ws.root());
    ws.add_primary("reject.pdf", 100, 1);
    ws.add_secondary("reject_1.pdf", 101, 1);
    ws.add_primary("keep.pdf", 110, 1);
    ws.add_secondary("keep_1.pdf", 111, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.root().to_path_buf());

    let summary = MergeOrchestrator::new(config, CommandBackend::new(tool))
        .run()
        .unwrap();

    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_primary_corrupt, 1);
    assert!(summary.failed_primary[0].reason.contains("refusing"));
    assert_eq!(listing(&ws.output()), vec!["keep.pdf"]);
}

#[test]
fn test_member_without_pdf_header_is_skipped() {
    let ws = Workspace::new();
    let tool = install_tool(ws.root());
    ws.add_primary("memo.pdf", 100, 1);
    ws.add_garbage(ws.secondary().join("memo_1.pdf"));
    ws.add_secondary("memo_2.pdf", 102, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.root().to_path_buf());

    let summary = MergeOrchestrator::new(config, CommandBackend::new(tool))
        .run()
        .unwrap();

    assert_eq!(summary.counters.skipped_secondary_corrupt, 1);
    assert_eq!(
        recorded_args(&ws.output().join("memo.pdf")),
        vec!["memo.pdf", "memo_2.pdf", "cat", "output", ".memo.pdf.tmp"]
    );
}

#[test]
fn test_hung_tool_is_killed_and_its_group_abandoned() {
    let ws = Workspace::new();
    let tool = install_tool(ws.root());
    ws.add_primary("stall.pdf", 100, 1);
    ws.add_secondary("stall_1.pdf", 101, 1);
    ws.add_primary("keep.pdf", 110, 1);
    ws.add_secondary("keep_1.pdf", 111, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.root().to_path_buf());
    config.backend = BackendKind::Command { program: tool };
    config.tool_timeout = Duration::from_secs(1);

    let started = Instant::now();
    let summary = run_blocking(config, EventEmitter::silent(), CancellationToken::new()).unwrap();

    assert!(started.elapsed() < Duration::from_secs(15));
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.counters.merged_groups, 1);
    assert_eq!(summary.counters.skipped_primary_corrupt, 1);
    assert!(summary.failed_primary[0].reason.contains("timed out"));
    assert_eq!(listing(&ws.output()), vec!["keep.pdf"]);
    assert!(!ws.output().join(pdfpair::lock::LOCK_FILE_NAME).exists());
}

#[test]
fn test_missing_tool_is_fatal_before_scanning() {
    let ws = Workspace::new();
    ws.add_primary("a.pdf", 100, 1);
    ws.add_secondary("a_1.pdf", 101, 1);

    let mut config = ws.config();
    config.output_parent = Some(ws.root().to_path_buf());

    let err = MergeOrchestrator::new(config, CommandBackend::new(ws.root().join("no-such-tool")))
        .run()
        .unwrap_err();

    assert!(matches!(err, PdfPairError::BackendUnavailable { .. }));
    assert!(!ws.output().exists());
}
