use serde::{Deserialize, Serialize};

/// Issue severity, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    /// Sort rank: critical first. Unknown severities sort last via the
    /// caller defaulting to `Medium` during normalization.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::High => "🟠",
            Severity::Medium => "🟡",
            Severity::Low => "🔵",
        }
    }
}

/// Issue category. `General` is the fallback when the model's label
/// matches nothing in the vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Bug,
    Performance,
    Refactoring,
    Style,
    Documentation,
    Testing,
    Validation,
    #[default]
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Bug => "bug",
            Category::Performance => "performance",
            Category::Refactoring => "refactoring",
            Category::Style => "style",
            Category::Documentation => "documentation",
            Category::Testing => "testing",
            Category::Validation => "validation",
            Category::General => "general",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Category::Security => "🔒",
            Category::Bug => "🐛",
            Category::Performance => "⚡",
            Category::Refactoring => "🔨",
            Category::Style => "💅",
            Category::Documentation => "📝",
            Category::Testing => "🧪",
            Category::Validation => "✅",
            Category::General => "💡",
        }
    }
}

/// How an issue's fix should be presented.
///
/// `Code` suggestions become auto-appliable GitLab suggestion blocks and
/// must survive the refiner's structural checks; `Conceptual` is prose
/// only; `Example` carries illustrative (non-appliable) code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Code,
    #[default]
    Conceptual,
    Example,
}

impl SuggestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionType::Code => "code",
            SuggestionType::Conceptual => "conceptual",
            SuggestionType::Example => "example",
        }
    }
}

/// One reviewable finding, in the canonical post-normalization shape.
///
/// Field names are part of the wire contract with the commenting layer
/// (`line_code_start`/`line_code_end` anchor GitLab multi-line
/// discussion positions); do not rename.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub start_line: u32,
    /// Defaults to `start_line` during normalization.
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub category: Category,
    /// One-line summary of the problem.
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub suggestion_type: SuggestionType,
    /// Replacement text. Only meaningful when `suggestion_type` is
    /// `Code` (exact replacement) or `Example` (illustrative).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_fix: Option<String>,
    /// GitLab line code for the range start, attached by the refiner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_code_start: Option<String>,
    /// GitLab line code for the range end, attached by the refiner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_code_end: Option<String>,
}

impl Issue {
    /// Number of new-file lines this issue spans.
    pub fn lines_spanned(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Downgrade an unsafe code suggestion to a conceptual explanation.
    /// The issue itself is never dropped, only the auto-appliable fix.
    pub fn downgrade_to_conceptual(&mut self) {
        self.suggestion_type = SuggestionType::Conceptual;
        self.code_fix = None;
    }
}

/// The normalized result of one model review call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewData {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
}
