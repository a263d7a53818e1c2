//! Annotates a unified diff with new-file line numbers before it is
//! sent to the model.
//!
//! Models are bad at counting hunk offsets, so every line the review
//! may target gets an explicit `[LINE N]` marker. Removed and context
//! lines are labeled too, telling the model they are not valid inline
//! comment targets.

use crate::review::line_map::HunkHeader;

/// Prefix each diff line with its addressability marker:
/// `[LINE N]` for added lines, `[REMOVED]` for deletions, `[CONTEXT]`
/// for unchanged lines. Hunk headers pass through untouched.
pub fn annotate_diff(diff: &str) -> String {
    let mut annotated = Vec::new();
    let mut current_new_line: Option<u32> = None;

    for line in diff.lines() {
        if let Some(header) = HunkHeader::parse(line) {
            current_new_line = Some(header.new_start);
            annotated.push(line.to_string());
            continue;
        }

        let Some(new_line) = current_new_line else {
            annotated.push(line.to_string());
            continue;
        };

        if line.starts_with('+') {
            annotated.push(format!("[LINE {new_line}] {line}"));
            current_new_line = Some(new_line + 1);
        } else if line.starts_with('-') {
            // Gone from the new file, the counter stays put.
            annotated.push(format!("[REMOVED] {line}"));
        } else {
            annotated.push(format!("[CONTEXT] {line}"));
            current_new_line = Some(new_line + 1);
        }
    }

    annotated.join("\n")
}
