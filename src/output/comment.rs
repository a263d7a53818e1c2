//! Renders issues and review results as GitLab-flavored Markdown.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::Value;

use crate::review::types::{Issue, ReviewData, Severity, SuggestionType};

const FOOTER: &str = "\n---\n*AI Code Review*";

/// Render one issue as an inline discussion body.
///
/// Code suggestions become GitLab `suggestion` blocks so the reviewer
/// gets an "Apply suggestion" button; the `-0+N` marker extends the
/// replacement over the N lines after the anchored one.
pub fn format_inline_comment(issue: &Issue) -> String {
    let severity = issue.severity;
    let category = issue.category;

    let mut comment = format!(
        "{} **{}** {} *{}*\n\n**Issue:** {}\n\n**Why it matters:** {}\n",
        severity.emoji(),
        severity.as_str().to_uppercase(),
        category.emoji(),
        title_case(category.as_str()),
        issue.issue,
        issue.explanation,
    );

    if let Some(code_fix) = issue.code_fix.as_deref() {
        match issue.suggestion_type {
            SuggestionType::Code if issue.start_line > 0 && issue.end_line >= issue.start_line => {
                // The comment anchors on start_line, which GitLab always
                // replaces; +N covers the rest of the range.
                let extra_lines = issue.end_line - issue.start_line;
                let _ = write!(
                    comment,
                    "\n**Suggested fix:**\n```suggestion:-0+{extra_lines}\n{code_fix}\n```\n"
                );
            }
            _ => {
                // Illustrative code, or a code fix with an unusable
                // range. Never rendered as auto-appliable.
                if !code_fix.trim().is_empty() {
                    let _ = write!(
                        comment,
                        "\n**Suggested approach:**\n```\n{code_fix}\n```\n"
                    );
                }
            }
        }
    }

    comment.push_str(FOOTER);
    comment
}

/// Render the top-level summary comment: overview, issue breakdown by
/// severity and category, and the run's metrics.
pub fn format_summary_comment(
    review: &ReviewData,
    files_reviewed: usize,
    inline_suppressed: usize,
    metrics: &Value,
) -> String {
    let issues = &review.issues;
    let count_of = |sev: Severity| issues.iter().filter(|i| i.severity == sev).count();
    let critical = count_of(Severity::Critical);
    let high = count_of(Severity::High);
    let medium = count_of(Severity::Medium);
    let low = count_of(Severity::Low);

    let mut comment = format!(
        "## 🤖 AI Code Review\n\n**Summary:**\n{}\n\n**Files Reviewed:** {files_reviewed}\n**Total Suggestions:** {}\n",
        review.summary,
        issues.len(),
    );

    if issues.is_empty() {
        comment.push_str("\n✅ **No issues detected** - Code looks great!\n");
    } else {
        comment.push_str("\n### 📊 Issue Breakdown\n\n**By Severity:**\n");
        for (count, emoji, label, hint) in [
            (critical, "🔴", "Critical", "Fix immediately"),
            (high, "🟠", "High", "Should fix"),
            (medium, "🟡", "Medium", "Consider fixing"),
            (low, "🔵", "Low", "Optional"),
        ] {
            if count > 0 {
                let _ = writeln!(comment, "- {emoji} **{label}:** {count} ({hint})");
            }
        }

        let mut by_category: BTreeMap<&str, (usize, &str)> = BTreeMap::new();
        for issue in issues {
            let entry = by_category
                .entry(issue.category.as_str())
                .or_insert((0, issue.category.emoji()));
            entry.0 += 1;
        }
        let mut categories: Vec<_> = by_category.into_iter().collect();
        categories.sort_by(|a, b| b.1.0.cmp(&a.1.0));

        comment.push_str("\n**By Category:**\n");
        for (name, (count, emoji)) in categories {
            let _ = writeln!(comment, "- {emoji} {}: {count}", title_case(name));
        }

        comment.push_str("\n### 💡 Next Steps\n\n");
        if critical > 0 {
            let _ = writeln!(
                comment,
                "⚠️ **Action Required:** Fix {critical} critical issue(s) before merging\n"
            );
        }
        comment
            .push_str("Click the **Apply suggestion** button on inline comments to auto-fix issues!\n");

        if inline_suppressed > 0 {
            let _ = writeln!(
                comment,
                "\nℹ️ {inline_suppressed} lower-severity suggestion(s) hit the per-severity inline \
                 comment limit and are counted above but not posted inline."
            );
        }
    }

    let tokens = &metrics["tokens"];
    let cost = &metrics["cost"];
    let _ = write!(
        comment,
        "\n### 📈 Review Metrics\n\n\
         - 🤖 Model: {}\n\
         - ⏱️ Duration: {:.2}s\n\
         - 🔄 API Calls: {}\n\
         - 🎯 Tokens: {} (Input: {}, Output: {})\n\
         - 💰 Cost: ${:.6} USD (Input: ${:.6}, Output: ${:.6})\n",
        metrics["model"].as_str().unwrap_or("Unknown"),
        metrics["duration_seconds"].as_f64().unwrap_or(0.0),
        metrics["api_calls"],
        tokens["total"],
        tokens["input"],
        tokens["output"],
        cost["total_cost_usd"].as_f64().unwrap_or(0.0),
        cost["input_cost_usd"].as_f64().unwrap_or(0.0),
        cost["output_cost_usd"].as_f64().unwrap_or(0.0),
    );

    comment.push_str("\n---\n*Powered by AI Code Review Bot*");
    comment
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
