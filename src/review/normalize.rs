//! Turns raw model output into a canonical [`ReviewData`].
//!
//! Models wrap JSON in markdown fences, emit stray control characters,
//! and get cut off mid-array by output limits. This module absorbs all
//! of that: it never returns an error, only a best-effort result that
//! degrades to an empty issue list with an explanatory summary.

use serde_json::Value;

use crate::review::types::{Category, Issue, ReviewData, Severity, SuggestionType};
use crate::util::floor_char_boundary;

/// Parse a model response into the canonical review shape.
pub fn normalize_response(response_text: &str) -> ReviewData {
    let cleaned = strip_control_chars(response_text);
    let cleaned = extract_fenced_block(&cleaned);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => finalize(value, false),
        Err(err) => {
            tracing::warn!(error = %err, "model response is not valid JSON, attempting salvage");
            salvage(cleaned)
        }
    }
}

/// Remove control characters that break JSON parsing, keeping tab,
/// newline, and carriage return.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Extract the content of the first markdown code fence, preferring a
/// ```json fence. Without a closing fence (truncated output) the rest
/// of the text is taken as-is.
fn extract_fenced_block(text: &str) -> &str {
    let start = if let Some(pos) = text.find("```json") {
        pos + "```json".len()
    } else if let Some(pos) = text.find("```") {
        pos + "```".len()
    } else {
        return text;
    };

    let body = &text[start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Repair truncated JSON: cut back to the last complete object, append
/// the missing closers, and retry. Falls back to an empty issue list
/// with the raw text prefix as the summary.
fn salvage(text: &str) -> ReviewData {
    if let Some(last_complete) = text.rfind('}') {
        let mut fixed = text[..=last_complete].to_string();

        let open_brackets = fixed.matches('[').count();
        let close_brackets = fixed.matches(']').count();
        let open_braces = fixed.matches('{').count();
        let close_braces = fixed.matches('}').count();
        for _ in close_brackets..open_brackets {
            fixed.push(']');
        }
        for _ in close_braces..open_braces {
            fixed.push('}');
        }

        if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
            let data = finalize(value, true);
            tracing::info!(
                issues = data.issues.len(),
                "salvaged truncated model response"
            );
            return data;
        }
    }

    tracing::error!("could not salvage model response, returning empty review");
    let prefix = &text[..floor_char_boundary(text, 300)];
    ReviewData {
        summary: format!("Review completed with parsing issues. Raw response (truncated): {prefix}..."),
        issues: Vec::new(),
    }
}

/// Coerce a parsed JSON value into the canonical shape and normalize
/// every issue's enum fields.
fn finalize(value: Value, truncated: bool) -> ReviewData {
    let (mut summary, raw_issues) = match value {
        Value::Object(mut map) => {
            let summary = map
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("Review completed")
                .to_string();
            let issues = match map.remove("issues") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (summary, issues)
        }
        // A bare array is taken as the issue list itself.
        Value::Array(items) => ("Review completed".to_string(), items),
        // A bare string keeps its content, not its JSON quoting.
        Value::String(s) => (s, Vec::new()),
        other => (other.to_string(), Vec::new()),
    };

    if truncated {
        summary.push_str(" (response was truncated)");
    }

    let mut issues: Vec<Issue> = raw_issues.iter().map(normalize_issue).collect();
    // Stable: issues keep their original order within a severity.
    issues.sort_by_key(|issue| issue.severity.rank());

    ReviewData { summary, issues }
}

fn normalize_issue(raw: &Value) -> Issue {
    let get_str = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let start_line = coerce_line(raw.get("start_line"));
    let end_line = match raw.get("end_line") {
        None | Some(Value::Null) => start_line,
        some => coerce_line(some),
    };

    Issue {
        file: get_str("file"),
        start_line,
        end_line,
        severity: normalize_severity(raw.get("severity")),
        category: normalize_category(raw.get("category")),
        issue: get_str("issue"),
        explanation: get_str("explanation"),
        suggestion_type: normalize_suggestion_type(raw.get("suggestion_type")),
        code_fix: raw
            .get("code_fix")
            .and_then(Value::as_str)
            .map(str::to_string),
        line_code_start: None,
        line_code_end: None,
    }
}

/// Integer, or a string holding one. Anything else is 0.
fn coerce_line(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Bucket a free-form severity label by substring matching. Models
/// write things like "High severity" or "P0 - blocker".
fn normalize_severity(value: Option<&Value>) -> Severity {
    let text = label_text(value, "medium");
    const CRITICAL: [&str; 5] = ["critical", "blocker", "p0", "sev0", "sev-0"];
    const HIGH: [&str; 4] = ["high", "p1", "sev1", "sev-1"];
    const LOW: [&str; 4] = ["low", "p3", "sev3", "sev-3"];

    if CRITICAL.iter().any(|t| text.contains(t)) {
        Severity::Critical
    } else if HIGH.iter().any(|t| text.contains(t)) {
        Severity::High
    } else if LOW.iter().any(|t| text.contains(t)) {
        Severity::Low
    } else {
        Severity::Medium
    }
}

/// Match the category vocabulary by substring, in fixed order so ties
/// are deterministic. Anything unrecognized becomes `General`.
fn normalize_category(value: Option<&Value>) -> Category {
    const VOCABULARY: [(&str, Category); 8] = [
        ("security", Category::Security),
        ("bug", Category::Bug),
        ("performance", Category::Performance),
        ("refactoring", Category::Refactoring),
        ("style", Category::Style),
        ("documentation", Category::Documentation),
        ("testing", Category::Testing),
        ("validation", Category::Validation),
    ];

    let text = label_text(value, "general");
    VOCABULARY
        .iter()
        .find(|(token, _)| text.contains(token))
        .map_or(Category::General, |(_, category)| *category)
}

/// `code`, `code_fix`, `code suggestion` all count as appliable code;
/// everything else is conceptual.
fn normalize_suggestion_type(value: Option<&Value>) -> SuggestionType {
    if label_text(value, "code").starts_with("code") {
        SuggestionType::Code
    } else {
        SuggestionType::Conceptual
    }
}

/// Lowercased string form of a label field, with a default for
/// missing/null values. Non-string JSON values are stringified so a
/// numeric severity still gets bucketed.
fn label_text(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_object() {
        let data = normalize_response(
            r#"{"summary": "Looks fine", "issues": [{"file": "a.py", "start_line": 3, "severity": "high", "issue": "x", "explanation": "y", "suggestion_type": "conceptual"}]}"#,
        );
        assert_eq!(data.summary, "Looks fine");
        assert_eq!(data.issues.len(), 1);
        assert_eq!(data.issues[0].severity, Severity::High);
        // Missing end_line falls back to start_line.
        assert_eq!(data.issues[0].end_line, 3);
    }

    #[test]
    fn test_json_fence_stripped() {
        let data = normalize_response("Here is my review:\n```json\n{\"summary\": \"ok\", \"issues\": []}\n```\nLet me know!");
        assert_eq!(data.summary, "ok");
    }

    #[test]
    fn test_untagged_fence_stripped() {
        let data = normalize_response("```\n{\"summary\": \"ok\", \"issues\": []}\n```");
        assert_eq!(data.summary, "ok");
    }

    #[test]
    fn test_control_chars_removed() {
        let data = normalize_response("{\"summary\": \"ok\u{0000}\u{0008}\", \"issues\": []}");
        assert_eq!(data.summary, "ok");
    }

    #[test]
    fn test_bare_array_wrapped() {
        let data = normalize_response(r#"[{"file": "a.py", "start_line": 1, "issue": "x"}]"#);
        assert_eq!(data.summary, "Review completed");
        assert_eq!(data.issues.len(), 1);
    }

    #[test]
    fn test_scalar_becomes_summary() {
        // The summary is the string's content, without JSON quotes.
        let data = normalize_response("\"no issues found\"");
        assert_eq!(data.summary, "no issues found");
        assert!(data.issues.is_empty());

        let data = normalize_response("true");
        assert_eq!(data.summary, "true");
    }

    #[test]
    fn test_severity_substring_buckets() {
        let data = normalize_response(
            r#"{"issues": [
                {"severity": "P0 - blocker"},
                {"severity": "High severity"},
                {"severity": "sev-3"},
                {"severity": "whatever"}
            ]}"#,
        );
        let got: Vec<Severity> = data.issues.iter().map(|i| i.severity).collect();
        // Already sorted by rank.
        assert_eq!(
            got,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn test_category_substring_and_fallback() {
        let data = normalize_response(
            r#"{"issues": [
                {"category": "Potential Security Flaw"},
                {"category": "perf"},
                {"category": null}
            ]}"#,
        );
        assert_eq!(data.issues[0].category, Category::Security);
        // "perf" is not a full vocabulary token.
        assert_eq!(data.issues[1].category, Category::General);
        assert_eq!(data.issues[2].category, Category::General);
    }

    #[test]
    fn test_suggestion_type_prefix_match() {
        let data = normalize_response(
            r#"{"issues": [
                {"suggestion_type": "code_fix"},
                {"suggestion_type": "Code suggestion"},
                {"suggestion_type": "idea"}
            ]}"#,
        );
        assert_eq!(data.issues[0].suggestion_type, SuggestionType::Code);
        assert_eq!(data.issues[1].suggestion_type, SuggestionType::Code);
        assert_eq!(data.issues[2].suggestion_type, SuggestionType::Conceptual);
    }

    #[test]
    fn test_line_numbers_from_strings() {
        let data = normalize_response(
            r#"{"issues": [{"start_line": "12", "end_line": " 14 "}, {"start_line": "not a number"}]}"#,
        );
        assert_eq!(data.issues[0].start_line, 12);
        assert_eq!(data.issues[0].end_line, 14);
        assert_eq!(data.issues[1].start_line, 0);
    }

    #[test]
    fn test_stable_sort_within_severity() {
        let data = normalize_response(
            r#"{"issues": [
                {"issue": "first medium"},
                {"issue": "a critical", "severity": "critical"},
                {"issue": "second medium"}
            ]}"#,
        );
        assert_eq!(data.issues[0].issue, "a critical");
        assert_eq!(data.issues[1].issue, "first medium");
        assert_eq!(data.issues[2].issue, "second medium");
    }

    // A response cut off mid-array still yields the complete issues
    // from the prefix, with the summary marking the truncation.
    #[test]
    fn test_truncated_array_salvaged() {
        let truncated = r#"{"summary": "Found problems", "issues": [
            {"file": "a.py", "start_line": 1, "issue": "complete one", "severity": "high"},
            {"file": "b.py", "start_line": 9, "issue": "also complete"},
            {"file": "c.py", "start_line": 3, "issue": "this one got cut o"#;

        let data = normalize_response(truncated);
        assert_eq!(data.issues.len(), 2);
        assert_eq!(data.issues[0].issue, "complete one");
        assert!(data.summary.contains("truncated"), "got: {}", data.summary);
    }

    #[test]
    fn test_truncated_fenced_response_salvaged() {
        // Output limit hit before the closing fence was emitted.
        let truncated = "```json\n{\"summary\": \"s\", \"issues\": [{\"file\": \"a.py\", \"start_line\": 2, \"issue\": \"ok\"}, {\"file\": \"b";
        let data = normalize_response(truncated);
        assert_eq!(data.issues.len(), 1);
        assert!(data.summary.contains("truncated"));
    }

    #[test]
    fn test_unsalvageable_garbage_degrades() {
        let data = normalize_response("the model wrote prose instead of JSON");
        assert!(data.issues.is_empty());
        assert!(data.summary.contains("parsing issues"));
        assert!(data.summary.contains("the model wrote prose"));
    }

    #[test]
    fn test_empty_response() {
        let data = normalize_response("");
        assert!(data.issues.is_empty());
    }

    // Normalization is idempotent: serializing a normalized result and
    // feeding it back produces the same enum values.
    #[test]
    fn test_normalization_idempotent() {
        let first = normalize_response(
            r#"{"summary": "s", "issues": [{"file": "a.py", "start_line": 1, "severity": "Blocker!", "category": "security hole", "suggestion_type": "code_fix", "code_fix": "x"}]}"#,
        );
        let reserialized = serde_json::to_string(&first).unwrap();
        let second = normalize_response(&reserialized);

        assert_eq!(second.issues[0].severity, first.issues[0].severity);
        assert_eq!(second.issues[0].category, first.issues[0].category);
        assert_eq!(second.issues[0].suggestion_type, first.issues[0].suggestion_type);
    }
}
