//! Combining primary and secondary scans into ordered merge groups.
//!
//! Ordering rules, all deterministic for a given set of input files:
//!
//! - Groups are ordered by prefix, ascending.
//! - A primary prefix shared by several files elects one representative: an
//!   unnumbered file beats a numbered one, then the smallest filename wins,
//!   then the smallest path.
//! - Members put numbered files first (ascending by number) and unnumbered
//!   files last; ties fall back to filename, then path.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::RootRole;
use crate::scan::{FileRecord, ScanResult, file_name_of};

/// Files that will be merged into one output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGroup {
    /// Shared, case-normalized prefix.
    pub prefix: String,
    /// Representative file; its pages come first and it names the output.
    pub primary_path: PathBuf,
    /// Files appended after the primary, in merge order.
    pub members: Vec<PathBuf>,
    /// Output filename: the primary's filename, original case.
    pub output_name: String,
}

/// Why a scanned file did not end up in any group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusedReason {
    /// No file in the other root shares its prefix.
    NoPair,
    /// Another primary file with the same prefix was elected representative.
    DuplicatePrefix,
}

impl UnusedReason {
    /// Human-readable explanation.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoPair => "no matching file in the other root for this prefix",
            Self::DuplicatePrefix => "another primary file with the same prefix was chosen",
        }
    }
}

/// A scanned file left out of every group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Root it was found in.
    pub role: RootRole,
    /// Why it was not grouped.
    pub reason: UnusedReason,
}

/// Outcome of matching two scans.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Groups in processing order.
    pub groups: Vec<MergeGroup>,
    /// Primary files not in any group, in scan order.
    pub unused_primary: Vec<UnusedFile>,
    /// Secondary files not in any group, in scan order.
    pub unused_secondary: Vec<UnusedFile>,
}

impl MatchResult {
    /// Whether no group could be formed.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Match primary representatives against secondary files by prefix.
///
/// A file never appears in more than one group, and never as both primary and
/// member of the same group (relevant when both scans cover the same tree).
pub fn match_scans(primary: &ScanResult, secondary: &ScanResult) -> MatchResult {
    let mut primary_buckets: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for record in &primary.records {
        primary_buckets
            .entry(record.key.prefix.as_str())
            .or_default()
            .push(record);
    }

    let mut secondary_buckets: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for record in &secondary.records {
        secondary_buckets
            .entry(record.key.prefix.as_str())
            .or_default()
            .push(record);
    }

    let mut groups = Vec::new();
    let mut grouped: HashSet<&Path> = HashSet::new();
    let mut losers: HashSet<&Path> = HashSet::new();

    for (prefix, candidates) in &primary_buckets {
        let Some(representative) = elect_representative(candidates) else {
            continue;
        };
        for candidate in candidates {
            if candidate.path != representative.path {
                losers.insert(candidate.path.as_path());
            }
        }

        let Some(secondaries) = secondary_buckets.get(prefix) else {
            continue;
        };

        let mut members: Vec<&FileRecord> = secondaries
            .iter()
            .copied()
            .filter(|r| r.path != representative.path && !grouped.contains(r.path.as_path()))
            .collect();
        if members.is_empty() {
            continue;
        }
        members.sort_by(|a, b| member_order(a, b));

        grouped.insert(representative.path.as_path());
        grouped.extend(members.iter().map(|r| r.path.as_path()));

        groups.push(MergeGroup {
            prefix: (*prefix).to_string(),
            primary_path: representative.path.clone(),
            members: members.iter().map(|r| r.path.clone()).collect(),
            output_name: file_name_of(&representative.path),
        });
    }

    let unused_primary = primary
        .records
        .iter()
        .filter(|r| !grouped.contains(r.path.as_path()))
        .map(|r| UnusedFile {
            path: r.path.clone(),
            role: RootRole::Primary,
            reason: if losers.contains(r.path.as_path()) {
                UnusedReason::DuplicatePrefix
            } else {
                UnusedReason::NoPair
            },
        })
        .collect();

    let unused_secondary = secondary
        .records
        .iter()
        .filter(|r| !grouped.contains(r.path.as_path()))
        .map(|r| UnusedFile {
            path: r.path.clone(),
            role: RootRole::Secondary,
            reason: UnusedReason::NoPair,
        })
        .collect();

    MatchResult {
        groups,
        unused_primary,
        unused_secondary,
    }
}

fn elect_representative<'a>(candidates: &[&'a FileRecord]) -> Option<&'a FileRecord> {
    candidates.iter().copied().min_by(|a, b| {
        a.key
            .sequence
            .is_some()
            .cmp(&b.key.sequence.is_some())
            .then_with(|| by_name_then_path(a, b))
    })
}

fn member_order(a: &FileRecord, b: &FileRecord) -> Ordering {
    let by_sequence = match (a.key.sequence, b.key.sequence) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_sequence.then_with(|| by_name_then_path(a, b))
}

fn by_name_then_path(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.path
        .file_name()
        .cmp(&b.path.file_name())
        .then_with(|| a.path.cmp(&b.path))
}
