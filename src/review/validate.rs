//! Structural soundness checks for proposed code replacements.
//!
//! Every predicate is a total function over plain text: it returns
//! `Ok(())` when the edit is structurally safe or `Err(reason)` with a
//! human-readable explanation. Nothing here panics; callers always get
//! a definite answer and decide what to do with a rejection.

/// The three bracket pairs tracked by the balance checks.
const BRACKET_TYPES: [(char, char, &str); 3] = [
    ('{', '}', "curly"),
    ('[', ']', "square"),
    ('(', ')', "paren"),
];

/// Tokens that mark a line as the continuation of a previous statement.
/// A replacement starting on such a line would desynchronize syntax.
const ORPHAN_STARTS: [&str; 9] = [")", "}", "]", ";", ",", ":", "else", "catch", "finally"];

/// Net bracket balance (opens minus closes) per bracket type.
fn bracket_balance(text: &str) -> [i64; 3] {
    let mut counts = [0i64; 3];
    for ch in text.chars() {
        for (i, (open, close, _)) in BRACKET_TYPES.iter().enumerate() {
            if ch == *open {
                counts[i] += 1;
            } else if ch == *close {
                counts[i] -= 1;
            }
        }
    }
    counts
}

/// Raw open/close counts per bracket type: (opens, closes).
fn bracket_counts(text: &str) -> [(u32, u32); 3] {
    let mut counts = [(0u32, 0u32); 3];
    for ch in text.chars() {
        for (i, (open, close, _)) in BRACKET_TYPES.iter().enumerate() {
            if ch == *open {
                counts[i].0 += 1;
            } else if ch == *close {
                counts[i].1 += 1;
            }
        }
    }
    counts
}

/// Leading whitespace (spaces/tabs) of a line.
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// First non-blank line's indentation, or empty when all lines are blank.
fn base_indent(text: &str) -> &str {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .map_or("", leading_whitespace)
}

/// Check that the net bracket balance of the replacement matches the
/// original for every bracket type.
pub fn validate_bracket_balance(original: &str, replacement: &str) -> Result<(), String> {
    let orig = bracket_balance(original);
    let repl = bracket_balance(replacement);

    for (i, (_, _, name)) in BRACKET_TYPES.iter().enumerate() {
        if orig[i] != repl[i] {
            return Err(format!(
                "{name} brackets not balanced (original: {}, replacement: {})",
                orig[i], repl[i]
            ));
        }
    }
    Ok(())
}

/// Detect asymmetric bracket removal: dropping a closer while keeping
/// its opener (or vice versa). Catches orphan-bracket edits even when
/// the net balance happens to match.
pub fn detect_bracket_side_mismatch(original: &str, replacement: &str) -> Result<(), String> {
    let orig = bracket_counts(original);
    let repl = bracket_counts(replacement);

    for (i, (open, close, _)) in BRACKET_TYPES.iter().enumerate() {
        let (orig_open, orig_close) = orig[i];
        let (repl_open, repl_close) = repl[i];

        // Removing closing brackets without removing opening ones.
        if repl_close < orig_close && repl_open >= orig_open {
            let removed = orig_close - repl_close;
            return Err(format!(
                "removes {removed} closing '{close}' but keeps opening '{open}' (creates orphan brackets)"
            ));
        }
        // Removing opening brackets without removing closing ones.
        if repl_open < orig_open && repl_close >= orig_close {
            let removed = orig_open - repl_open;
            return Err(format!(
                "removes {removed} opening '{open}' but keeps closing '{close}' (creates orphan brackets)"
            ));
        }
    }
    Ok(())
}

/// Check that the selected lines start at a natural statement boundary.
///
/// A first line beginning with a closer, separator, or continuation
/// keyword belongs to the previous (unselected) statement; replacing it
/// in isolation would break that statement.
pub fn check_statement_boundaries(original_lines: &[String], start_line: u32) -> Result<(), String> {
    let Some(first_line) = original_lines.first() else {
        return Ok(());
    };
    let first = first_line.trim();

    for orphan in ORPHAN_STARTS {
        if first.starts_with(orphan) {
            return Err(format!(
                "line {start_line} starts with '{orphan}' (orphaned - likely part of previous statement)"
            ));
        }
    }
    if first.starts_with("?.") {
        return Err(format!(
            "line {start_line} starts with method chain continuation (orphaned)"
        ));
    }
    Ok(())
}

/// Decide whether a replacement with a different line count is still a
/// structurally sound edit (e.g. adding a guard clause).
///
/// Allowed only when the net bracket balance is unchanged, no bracket
/// side was removed asymmetrically, and the base indentation of the
/// first non-blank line is preserved. Interior line indentation is not
/// checked for variable-length edits; a full rewrite is expected to be
/// internally consistent already.
pub fn is_line_count_change_valid(
    original: &str,
    replacement: &str,
    original_line_count: u32,
    replacement_line_count: u32,
) -> Result<(), String> {
    if original_line_count == replacement_line_count {
        return Ok(());
    }

    let orig_balance = bracket_balance(original);
    let repl_balance = bracket_balance(replacement);
    if orig_balance != repl_balance {
        return Err(format!(
            "bracket balance changed: {orig_balance:?} -> {repl_balance:?}"
        ));
    }

    detect_bracket_side_mismatch(original, replacement)?;

    let orig_indent = base_indent(original);
    let repl_indent = base_indent(replacement);
    if orig_indent != repl_indent {
        return Err(format!(
            "base indentation changed ('{orig_indent}' -> '{repl_indent}')"
        ));
    }

    Ok(())
}
