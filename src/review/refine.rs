//! Validates every proposed code suggestion for one review and
//! downgrades anything that could corrupt the file when applied.
//!
//! Policy: downgrade, never drop. An unsafe `code` suggestion becomes a
//! `conceptual` explanation with its replacement text cleared, so the
//! reviewer still sees the finding even when the auto-appliable patch
//! was rejected.

use crate::config::types::ReviewConfig;
use crate::gitlab::types::FileChange;
use crate::review::line_map::{build_file_line_maps, original_lines};
use crate::review::types::{Issue, SuggestionType};
use crate::review::validate;

/// Result of refining one review's issue list.
#[derive(Debug)]
pub struct RefineOutcome {
    pub issues: Vec<Issue>,
    /// How many code suggestions were downgraded to conceptual.
    pub downgraded: usize,
}

/// Cross-reference every issue with the diff line maps: attach GitLab
/// line codes and run the structural safety pipeline on code fixes.
pub fn refine_issues(
    issues: Vec<Issue>,
    changes: &[FileChange],
    config: &ReviewConfig,
) -> RefineOutcome {
    let file_maps = build_file_line_maps(changes);
    let mut refined = Vec::with_capacity(issues.len());
    let mut downgraded = 0usize;

    for mut issue in issues {
        let line_map = file_maps.get(issue.file.as_str());

        // Line codes are useful for every issue kind, not just code fixes.
        if let Some(map) = line_map
            && issue.start_line > 0
        {
            if let Some(start_meta) = map.get(&issue.start_line) {
                issue.line_code_start = Some(start_meta.line_code.clone());
                issue.line_code_end = Some(
                    map.get(&issue.end_line)
                        .map_or(start_meta.line_code.clone(), |m| m.line_code.clone()),
                );
            }
        }

        if issue.suggestion_type != SuggestionType::Code {
            refined.push(issue);
            continue;
        }

        if let Err(reason) = validate_code_fix(&mut issue, line_map, config) {
            tracing::warn!(
                file = %issue.file,
                start_line = issue.start_line,
                end_line = issue.end_line,
                reason = %reason,
                "downgrading code suggestion to conceptual"
            );
            issue.downgrade_to_conceptual();
            downgraded += 1;
        }
        refined.push(issue);
    }

    if downgraded > 0 {
        tracing::info!(downgraded, "converted unsafe code suggestions to conceptual");
    }

    RefineOutcome {
        issues: refined,
        downgraded,
    }
}

/// Run the structural pipeline on one code suggestion.
/// Returns the rejection reason at the first failing rule.
fn validate_code_fix(
    issue: &mut Issue,
    line_map: Option<&crate::review::line_map::LineMap>,
    config: &ReviewConfig,
) -> Result<(), String> {
    let Some(code_fix) = issue.code_fix.as_deref().filter(|s| !s.is_empty()) else {
        return Err("code suggestion without replacement text".into());
    };

    let lines_to_replace = issue.lines_spanned();
    let replacement_line_count = code_fix.split('\n').count() as u32;

    // A replacement with fewer lines than the range silently deletes
    // code on apply. Never salvage.
    if replacement_line_count < lines_to_replace {
        return Err(format!(
            "replacement has {replacement_line_count} line(s) for a {lines_to_replace}-line range (would delete code)"
        ));
    }

    // Every remaining rule needs the original text; without it the edit
    // cannot be proven safe, so reject conservatively.
    let original = line_map
        .and_then(|map| original_lines(map, issue.start_line, issue.end_line))
        .ok_or_else(|| "original lines not found in diff (cannot validate)".to_string())?;
    let original_text = original.join("\n");

    if replacement_line_count != lines_to_replace {
        validate::is_line_count_change_valid(
            &original_text,
            code_fix,
            lines_to_replace,
            replacement_line_count,
        )?;
    }

    if lines_to_replace > config.max_suggestion_lines {
        return Err(format!(
            "replaces {lines_to_replace} lines (max: {})",
            config.max_suggestion_lines
        ));
    }
    if lines_to_replace > config.warn_suggestion_lines {
        tracing::warn!(
            file = %issue.file,
            lines = lines_to_replace,
            "large replacement, keeping as code suggestion"
        );
    }

    // Replacing a long range with a comparably long body is a function
    // rewrite, not a local fix, even when the other checks pass.
    if lines_to_replace >= config.rewrite_original_lines
        && replacement_line_count >= config.rewrite_replacement_lines
    {
        return Err(format!(
            "function-level rewrite detected ({lines_to_replace} -> {replacement_line_count} lines)"
        ));
    }

    if replacement_line_count > lines_to_replace * 3 {
        tracing::warn!(
            file = %issue.file,
            original = lines_to_replace,
            replacement = replacement_line_count,
            "replacement much longer than original"
        );
    }

    // Per-line indentation must match exactly for positions covered by
    // the original range.
    for (idx, fix_line) in code_fix.split('\n').enumerate() {
        let Some(original_line) = original.get(idx) else {
            break;
        };
        let orig_indent = validate::leading_whitespace(original_line);
        let fix_indent = validate::leading_whitespace(fix_line);
        if orig_indent != fix_indent {
            return Err(format!(
                "indentation mismatch at line {} ('{orig_indent}' vs '{fix_indent}')",
                issue.start_line + idx as u32
            ));
        }
    }

    validate::validate_bracket_balance(&original_text, code_fix)?;
    validate::detect_bracket_side_mismatch(&original_text, code_fix)?;
    validate::check_statement_boundaries(&original, issue.start_line)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::line_map::generate_line_code;
    use crate::review::types::Severity;

    fn config() -> ReviewConfig {
        ReviewConfig::default()
    }

    fn change(path: &str, diff: &str) -> FileChange {
        FileChange {
            new_path: Some(path.to_string()),
            old_path: Some(path.to_string()),
            diff: diff.to_string(),
            ..Default::default()
        }
    }

    fn code_issue(file: &str, start: u32, end: u32, fix: &str) -> Issue {
        Issue {
            file: file.into(),
            start_line: start,
            end_line: end,
            severity: Severity::High,
            issue: "test issue".into(),
            explanation: "explanation".into(),
            suggestion_type: SuggestionType::Code,
            code_fix: Some(fix.into()),
            ..Default::default()
        }
    }

    // A 1-for-1 replacement of a changed line survives
    // refinement and gains the line codes for (a.py, 1, 1).
    #[test]
    fn test_valid_single_line_replacement_kept() {
        let changes = vec![change("a.py", "@@ -1,2 +1,2 @@\n-old line\n+new line\n context")];
        let issue = code_issue("a.py", 1, 1, "new line fixed");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 0);

        let refined = &outcome.issues[0];
        assert_eq!(refined.suggestion_type, SuggestionType::Code);
        let expected = generate_line_code("a.py", 1, 1);
        assert_eq!(refined.line_code_start.as_deref(), Some(expected.as_str()));
        assert_eq!(refined.line_code_end.as_deref(), Some(expected.as_str()));
    }

    // A 3-line range with a 2-line replacement must be
    // downgraded, never reach the caller as a code suggestion.
    #[test]
    fn test_shrinking_replacement_downgraded() {
        let diff = "@@ -1,3 +1,3 @@\n+line one\n+line two\n+line three";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue("a.py", 1, 3, "line one\nline two");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
        let refined = &outcome.issues[0];
        assert_eq!(refined.suggestion_type, SuggestionType::Conceptual);
        assert!(refined.code_fix.is_none());
        // The finding itself is preserved.
        assert_eq!(refined.issue, "test issue");
        assert_eq!(refined.explanation, "explanation");
    }

    #[test]
    fn test_missing_code_fix_downgraded() {
        let changes = vec![change("a.py", "@@ -1,1 +1,1 @@\n+x")];
        let mut issue = code_issue("a.py", 1, 1, "");
        issue.code_fix = None;

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
        assert_eq!(outcome.issues[0].suggestion_type, SuggestionType::Conceptual);
    }

    // An inverted range (garbage end_line coerced to 0 upstream) spans
    // no lines, so nothing can be proven about the fix. It must be
    // downgraded, not waved through on vacuously-passing checks.
    #[test]
    fn test_inverted_range_downgraded() {
        let diff = "@@ -1,2 +1,2 @@\n+line one\n+line two";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue("a.py", 2, 0, "line two fixed");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
        let refined = &outcome.issues[0];
        assert_eq!(refined.suggestion_type, SuggestionType::Conceptual);
        assert!(refined.code_fix.is_none());
    }

    #[test]
    fn test_unmapped_file_downgraded() {
        // No diff for the referenced file: original content cannot be
        // retrieved, so the code fix is rejected conservatively.
        let changes = vec![change("other.py", "@@ -1,1 +1,1 @@\n+x")];
        let issue = code_issue("a.py", 1, 1, "replacement");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
        assert!(outcome.issues[0].line_code_start.is_none());
    }

    #[test]
    fn test_oversized_range_downgraded() {
        let mut diff = String::from("@@ -1,12 +1,12 @@\n");
        for i in 1..=12 {
            diff.push_str(&format!("+line {i}\n"));
        }
        let changes = vec![change("a.py", &diff)];
        let fix = (1..=12).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let issue = code_issue("a.py", 1, 12, &fix);

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
    }

    #[test]
    fn test_function_rewrite_heuristic() {
        let mut cfg = config();
        // Tighten the rewrite thresholds so a 4->4 edit trips them.
        cfg.rewrite_original_lines = 4;
        cfg.rewrite_replacement_lines = 4;
        cfg.max_suggestion_lines = 10;

        let mut diff = String::from("@@ -1,4 +1,4 @@\n");
        for i in 1..=4 {
            diff.push_str(&format!("+line {i}\n"));
        }
        let changes = vec![change("a.py", &diff)];
        let fix = "line 1\nline 2\nline 3\nline 4";
        let issue = code_issue("a.py", 1, 4, fix);

        let outcome = refine_issues(vec![issue], &changes, &cfg);
        assert_eq!(outcome.downgraded, 1);
    }

    #[test]
    fn test_indentation_mismatch_downgraded() {
        let diff = "@@ -1,2 +1,2 @@\n+    indented line\n+    second line";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue("a.py", 1, 2, "  wrong indent\n    second line");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
    }

    #[test]
    fn test_bracket_imbalance_downgraded() {
        let diff = "@@ -1,1 +1,1 @@\n+if (x) { y(); }";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue("a.py", 1, 1, "if (x) { y();");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
    }

    #[test]
    fn test_orphan_statement_start_downgraded() {
        let diff = "@@ -1,1 +1,1 @@\n+} else {";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue("a.py", 1, 1, "} otherwise {");

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 1);
    }

    #[test]
    fn test_guard_clause_growth_allowed() {
        let diff = "@@ -1,1 +1,1 @@\n+    return user.name;";
        let changes = vec![change("a.py", diff)];
        let issue = code_issue(
            "a.py",
            1,
            1,
            "    if (!user) return null;\n    return user.name;",
        );

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 0);
        assert_eq!(outcome.issues[0].suggestion_type, SuggestionType::Code);
    }

    #[test]
    fn test_conceptual_issues_pass_through_with_line_codes() {
        let diff = "@@ -5,1 +5,1 @@\n+let x = 1;";
        let changes = vec![change("a.py", diff)];
        let issue = Issue {
            file: "a.py".into(),
            start_line: 5,
            end_line: 5,
            suggestion_type: SuggestionType::Conceptual,
            explanation: "restructure this".into(),
            ..Default::default()
        };

        let outcome = refine_issues(vec![issue], &changes, &config());
        assert_eq!(outcome.downgraded, 0);
        assert!(outcome.issues[0].line_code_start.is_some());
    }

    #[test]
    fn test_no_issue_is_ever_dropped() {
        let changes = vec![change("a.py", "@@ -1,1 +1,1 @@\n+x")];
        let issues = vec![
            code_issue("a.py", 1, 1, "y"),
            code_issue("missing.py", 1, 1, "z"),
            Issue::default(),
        ];
        let outcome = refine_issues(issues, &changes, &config());
        assert_eq!(outcome.issues.len(), 3);
    }

    #[test]
    fn test_end_line_code_falls_back_to_start() {
        // end_line outside the map: line_code_end mirrors the start code.
        let diff = "@@ -1,1 +1,1 @@\n+only line";
        let changes = vec![change("a.py", diff)];
        let issue = Issue {
            file: "a.py".into(),
            start_line: 1,
            end_line: 9,
            suggestion_type: SuggestionType::Conceptual,
            ..Default::default()
        };

        let outcome = refine_issues(vec![issue], &changes, &config());
        let refined = &outcome.issues[0];
        assert_eq!(refined.line_code_start, refined.line_code_end);
    }
}
