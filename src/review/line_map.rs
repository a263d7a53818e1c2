use indexmap::IndexMap;
use regex::Regex;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::gitlab::types::FileChange;

/// Regex for parsing unified diff hunk headers.
/// Matches: `@@ -start1[,size1] +start2[,size2] @@ [section_header]`
static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@[ ]?(.*)").unwrap());

/// Parsed hunk header values.
#[derive(Debug, Clone)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub section_header: String,
}

impl HunkHeader {
    pub fn parse(line: &str) -> Option<Self> {
        let caps = HUNK_HEADER_RE.captures(line)?;
        Some(Self {
            old_start: caps[1].parse().unwrap_or(0),
            old_count: caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
            new_start: caps[3].parse().unwrap_or(0),
            new_count: caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
            section_header: caps.get(5).map_or("", |m| m.as_str()).to_string(),
        })
    }
}

/// One line of the new file, as seen through the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Line text without the diff prefix character.
    pub content: String,
    /// Old-file line number this line replaced, or 0 for a pure insertion.
    pub old_line: u32,
    /// GitLab line code anchoring this exact diff position.
    pub line_code: String,
}

/// Per-file map of new-file line number → record, in parse order.
/// New-line keys are unique and strictly increasing within one file.
pub type LineMap = IndexMap<u32, LineRecord>;

/// All mapped files for one review. Files whose diff produced no
/// records are absent, never stored as an empty map.
pub type FileLineMap = HashMap<String, LineMap>;

/// Compute a GitLab line code: `sha1_hex(path_old_new)` suffixed with
/// the raw line numbers. Must match `Gitlab::Diff::LineCode.generate`
/// bit-for-bit or multi-line comment anchoring silently degrades.
pub fn generate_line_code(file_path: &str, old_line: u32, new_line: u32) -> String {
    let base = format!("{file_path}_{old_line}_{new_line}");
    let digest = Sha1::digest(base.as_bytes());
    format!("{}_{old_line}_{new_line}", hex::encode(digest))
}

/// Build the per-file line maps for a set of MR file changes.
pub fn build_file_line_maps(changes: &[FileChange]) -> FileLineMap {
    let mut file_maps = FileLineMap::new();

    for change in changes {
        let Some(file_path) = change.path() else {
            continue;
        };
        if change.diff.is_empty() {
            continue;
        }

        let line_map = build_line_map(file_path, &change.diff);
        if !line_map.is_empty() {
            file_maps.insert(file_path.to_string(), line_map);
        }
    }

    file_maps
}

/// Walk one file's unified diff and map every new-file line.
///
/// A `-` line queues its old line number; the next `+` line consumes the
/// queue head as the old line it replaced. A context line means earlier
/// removals were fully consumed, so the queue is cleared.
pub fn build_line_map(file_path: &str, diff: &str) -> LineMap {
    let mut line_map = LineMap::new();
    let mut current_old_line: Option<u32> = None;
    let mut current_new_line: Option<u32> = None;
    let mut removed_old_lines: Vec<u32> = Vec::new();

    for line in diff.lines() {
        if let Some(header) = HunkHeader::parse(line) {
            current_old_line = Some(header.old_start);
            current_new_line = Some(header.new_start);
            removed_old_lines.clear();
            continue;
        }

        let (Some(old_line), Some(new_line)) = (current_old_line, current_new_line) else {
            // Lines before the first hunk header (e.g. `--- a/f`) are not addressable.
            continue;
        };

        if let Some(content) = line.strip_prefix('+') {
            let old_for_line = if removed_old_lines.is_empty() {
                0 // pure addition
            } else {
                removed_old_lines.remove(0)
            };
            line_map.insert(
                new_line,
                LineRecord {
                    content: content.to_string(),
                    old_line: old_for_line,
                    line_code: generate_line_code(file_path, old_for_line, new_line),
                },
            );
            current_new_line = Some(new_line + 1);
        } else if line.starts_with('-') {
            removed_old_lines.push(old_line);
            current_old_line = Some(old_line + 1);
        } else if let Some(content) = line.strip_prefix(' ') {
            line_map.insert(
                new_line,
                LineRecord {
                    content: content.to_string(),
                    old_line,
                    line_code: generate_line_code(file_path, old_line, new_line),
                },
            );
            current_new_line = Some(new_line + 1);
            current_old_line = Some(old_line + 1);
            removed_old_lines.clear();
        }
        // Anything else (`\ No newline at end of file`) leaves counters untouched.
    }

    line_map
}

/// Extract the original content for an inclusive new-line range.
/// Returns `None` if the range is inverted or any line in it is
/// unmapped; an empty answer would let structural checks pass on
/// nothing.
pub fn original_lines(map: &LineMap, start_line: u32, end_line: u32) -> Option<Vec<String>> {
    if end_line < start_line {
        return None;
    }
    let mut lines = Vec::with_capacity((end_line - start_line + 1) as usize);
    for line_num in start_line..=end_line {
        lines.push(map.get(&line_num)?.content.clone());
    }
    Some(lines)
}
