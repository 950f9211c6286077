//! Grouping keys derived from bare filenames.
//!
//! A key is the lowercased file stem with one trailing sequence marker
//! removed. Markers are tried in a fixed order and the first match wins:
//!
//! 1. `name (3)`  - parenthesized number, whitespace before it trimmed
//! 2. `name_3`    - underscore and digits
//! 3. `name 3`    - a single space and digits
//!
//! Anything else keeps the whole stem as its prefix and has no sequence.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)(?P<prefix>.*?)\s*\((?P<seq>[0-9]+)\)$").expect("valid regex"));

static UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)(?P<prefix>.*)_(?P<seq>[0-9]+)$").expect("valid regex"));

static SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)(?P<prefix>.*) (?P<seq>[0-9]+)$").expect("valid regex"));

/// Grouping key of one file: a case-normalized prefix and an optional
/// sequence number used only for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    /// Lowercased stem with the trailing sequence marker removed.
    pub prefix: String,
    /// Number taken from the trailing marker, if there was one.
    pub sequence: Option<u64>,
}

impl FileKey {
    fn unnumbered(prefix: String) -> Self {
        Self {
            prefix,
            sequence: None,
        }
    }
}

/// Derive the grouping key from a bare filename.
///
/// Pure and total: every string yields a key. A marker whose prefix would be
/// empty, or whose digits do not fit in a `u64`, does not count as a match and
/// the next rule is tried instead.
///
/// # Examples
///
/// ```
/// use pdfpair::key::extract;
///
/// let key = extract("Report (2).pdf");
/// assert_eq!(key.prefix, "report");
/// assert_eq!(key.sequence, Some(2));
///
/// let key = extract("Report.pdf");
/// assert_eq!(key.prefix, "report");
/// assert_eq!(key.sequence, None);
/// ```
pub fn extract(filename: &str) -> FileKey {
    let stem = stem_of(filename).to_lowercase();

    for pattern in [&*PARENTHESIZED, &*UNDERSCORE, &*SPACE] {
        if let Some(key) = try_pattern(pattern, &stem) {
            return key;
        }
    }

    FileKey::unnumbered(stem)
}

/// Filename without its final extension.
fn stem_of(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn try_pattern(pattern: &Regex, stem: &str) -> Option<FileKey> {
    let caps = pattern.captures(stem)?;
    let prefix = caps.name("prefix")?.as_str();
    if prefix.is_empty() {
        return None;
    }
    let sequence = caps.name("seq")?.as_str().parse::<u64>().ok()?;

    Some(FileKey {
        prefix: prefix.to_string(),
        sequence: Some(sequence),
    })
}
