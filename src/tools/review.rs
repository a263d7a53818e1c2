//! The merge request review pipeline.
//!
//! Fetches the MR and its diffs, prompts the model once over all
//! reviewable files, then normalizes, refines, and publishes the
//! result as inline discussions plus one summary comment.

use std::collections::HashMap;
use std::fmt::Write;

use minijinja::Value;

use crate::ai::{AiAdapter, create_adapter};
use crate::config::loader::get_settings;
use crate::config::types::{ReviewConfig, Settings};
use crate::error::MrAgentError;
use crate::gitlab::client::GitlabClient;
use crate::gitlab::types::{FileChange, MrDetails};
use crate::metrics::ReviewMetrics;
use crate::output::comment::{format_inline_comment, format_summary_comment};
use crate::review::annotate::annotate_diff;
use crate::review::normalize::normalize_response;
use crate::review::refine::refine_issues;
use crate::review::types::{Issue, ReviewData, Severity};
use crate::template::render::render_prompt;
use crate::util::truncate_on_line_boundary;

/// MR review tool. Owns the GitLab client and the model adapter for
/// one review run.
pub struct MrReviewer {
    gitlab: GitlabClient,
    adapter: Box<dyn AiAdapter>,
}

impl MrReviewer {
    pub fn new(mr_url: &str) -> Result<Self, MrAgentError> {
        let settings = get_settings();
        Ok(Self {
            gitlab: GitlabClient::from_mr_url(mr_url)?,
            adapter: create_adapter(&settings)?,
        })
    }

    /// Run the full review pipeline.
    pub async fn run(&self) -> Result<(), MrAgentError> {
        let settings = get_settings();

        let mr = self.gitlab.get_merge_request_changes().await?;
        tracing::info!(
            mr_iid = mr.details.iid,
            title = %mr.details.title,
            state = %mr.details.state,
            changed_files = mr.changes.len(),
            "fetched merge request"
        );

        let files = prepare_files(mr.changes, &settings.review);
        if files.is_empty() {
            tracing::info!("no reviewable files after filtering, nothing to do");
            return Ok(());
        }

        let mut metrics =
            ReviewMetrics::new(self.adapter.display_name(), self.adapter.pricing());
        let review = review_changes(
            self.adapter.as_ref(),
            &mr.details,
            &files,
            &settings,
            &mut metrics,
        )
        .await?;
        metrics.log();

        if settings.config.publish_output {
            self.publish(&review, &mr.details, files.len(), &metrics, &settings.review)
                .await?;
        } else {
            print_review(&review, files.len(), &metrics);
        }

        Ok(())
    }

    async fn publish(
        &self,
        review: &ReviewData,
        details: &MrDetails,
        files_reviewed: usize,
        metrics: &ReviewMetrics,
        config: &ReviewConfig,
    ) -> Result<(), MrAgentError> {
        let selected = select_for_posting(&review.issues, config);
        let inline_suppressed = review.issues.len() - selected.len();
        let mut posted = 0usize;

        for issue in &selected {
            if !has_postable_position(issue) {
                tracing::debug!(issue = %issue.issue, "skipping issue without a usable position");
                continue;
            }
            let body = format_inline_comment(issue);
            match self
                .gitlab
                .post_inline_comment(
                    &details.diff_refs,
                    &issue.file,
                    issue.start_line,
                    issue.end_line,
                    issue.line_code_start.as_deref(),
                    issue.line_code_end.as_deref(),
                    &body,
                )
                .await
            {
                Ok(()) => posted += 1,
                // A failed inline comment should not abort the run.
                Err(e) => tracing::warn!(
                    file = %issue.file,
                    start_line = issue.start_line,
                    error = %e,
                    "failed to post inline comment"
                ),
            }
        }
        tracing::info!(
            posted,
            selected = selected.len(),
            total = review.issues.len(),
            "posted inline comments"
        );

        let summary =
            format_summary_comment(review, files_reviewed, inline_suppressed, &metrics.to_value());
        self.gitlab.post_comment(&summary).await?;
        tracing::info!(mr_url = %details.web_url, "posted summary comment");
        Ok(())
    }
}

/// Call the model and turn its raw text into a refined review.
///
/// Separated from the GitLab side so it can run against any adapter.
pub async fn review_changes(
    adapter: &dyn AiAdapter,
    details: &MrDetails,
    files: &[FileChange],
    settings: &Settings,
    metrics: &mut ReviewMetrics,
) -> Result<ReviewData, MrAgentError> {
    let changes_text = build_changes_text(files, &settings.review);
    let vars = build_prompt_vars(details, &changes_text, files.len(), &settings.review);
    let rendered = render_prompt(&settings.review_prompt, vars)?;

    tracing::info!(
        model = adapter.model_name(),
        provider = %adapter.provider(),
        prompt_bytes = rendered.user.len(),
        "calling model for review"
    );
    let response = adapter.complete(&rendered.system, &rendered.user).await?;
    metrics.add_api_call(response.usage.as_ref());

    let review = normalize_response(&response.text);
    tracing::info!(issues = review.issues.len(), "model review parsed");

    let outcome = refine_issues(review.issues, files, &settings.review);
    Ok(ReviewData {
        summary: review.summary,
        issues: outcome.issues,
    })
}

/// Drop files the review should never look at and cap the rest.
pub fn prepare_files(changes: Vec<FileChange>, config: &ReviewConfig) -> Vec<FileChange> {
    let mut files: Vec<FileChange> = changes
        .into_iter()
        .filter(|f| {
            if f.deleted_file || f.diff.is_empty() {
                return false;
            }
            let Some(path) = f.path() else {
                return false;
            };
            if config.is_excluded(path) {
                tracing::debug!(file = path, "excluded from review");
                return false;
            }
            true
        })
        .collect();

    if files.len() > config.max_files as usize {
        tracing::warn!(
            total = files.len(),
            max_files = config.max_files,
            "too many changed files, reviewing the first max_files only"
        );
        files.truncate(config.max_files as usize);
    }
    files
}

/// Concatenate per-file annotated diffs into the prompt's change listing.
fn build_changes_text(files: &[FileChange], config: &ReviewConfig) -> String {
    let mut out = String::new();
    for file in files {
        let diff = truncate_on_line_boundary(&file.diff, config.max_diff_length);
        let truncated = diff.len() < file.diff.len();
        let _ = write!(
            out,
            "File: {}\n{}",
            file.path().unwrap_or("(unknown)"),
            annotate_diff(diff)
        );
        if truncated {
            out.push_str("\n... (diff truncated)");
        }
        out.push('\n');
    }
    out
}

fn build_prompt_vars(
    details: &MrDetails,
    changes_text: &str,
    num_files: usize,
    config: &ReviewConfig,
) -> HashMap<String, Value> {
    let mut vars = HashMap::new();
    vars.insert("mr_title".into(), Value::from(details.title.as_str()));
    vars.insert(
        "mr_description".into(),
        Value::from(details.description.as_deref().unwrap_or("(no description)")),
    );
    vars.insert(
        "source_branch".into(),
        Value::from(details.source_branch.as_str()),
    );
    vars.insert(
        "target_branch".into(),
        Value::from(details.target_branch.as_str()),
    );
    vars.insert("num_files".into(), Value::from(num_files));
    vars.insert("changes".into(), Value::from(changes_text));
    vars.insert(
        "max_suggestion_lines".into(),
        Value::from(config.max_suggestion_lines),
    );
    vars
}

/// An inline discussion needs a file path and a coherent line range.
/// `end_line` below `start_line` survives normalization when the model
/// emits garbage for it, so it is re-checked here.
fn has_postable_position(issue: &Issue) -> bool {
    !issue.file.is_empty() && issue.start_line > 0 && issue.end_line >= issue.start_line
}

/// Pick which issues get inline comments. Critical issues always post;
/// the lower severities are capped so a chatty model cannot flood the MR.
pub fn select_for_posting<'a>(issues: &'a [Issue], config: &ReviewConfig) -> Vec<&'a Issue> {
    let mut high = 0u32;
    let mut medium = 0u32;
    let mut low = 0u32;

    issues
        .iter()
        .filter(|issue| match issue.severity {
            Severity::Critical => true,
            Severity::High => {
                high += 1;
                high <= config.max_high_issues
            }
            Severity::Medium => {
                medium += 1;
                medium <= config.max_medium_issues
            }
            Severity::Low => {
                low += 1;
                low <= config.max_low_issues
            }
        })
        .collect()
}

/// Dry-run output when publishing is disabled.
fn print_review(review: &ReviewData, files_reviewed: usize, metrics: &ReviewMetrics) {
    println!(
        "{}",
        format_summary_comment(review, files_reviewed, 0, &metrics.to_value())
    );
    for issue in &review.issues {
        println!(
            "\n--- {}:{}-{} ---\n{}",
            issue.file,
            issue.start_line,
            issue.end_line,
            format_inline_comment(issue)
        );
    }
}
