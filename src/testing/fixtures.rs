//! Shared fixtures for pipeline tests.

use std::collections::HashMap;

use crate::config::types::Settings;
use crate::gitlab::types::{DiffRefs, FileChange, MrDetails};

/// Settings with the embedded prompt templates loaded.
pub fn settings() -> Settings {
    crate::config::loader::load_settings(&HashMap::new()).expect("embedded settings load")
}

pub fn mr_details() -> MrDetails {
    MrDetails {
        iid: 42,
        title: "Add login endpoint".into(),
        description: Some("Implements password login.".into()),
        source_branch: "feature/login".into(),
        target_branch: "main".into(),
        state: "opened".into(),
        web_url: "https://gitlab.example.com/acme/app/-/merge_requests/42".into(),
        diff_refs: DiffRefs {
            base_sha: "a1b2c3".into(),
            start_sha: "a1b2c3".into(),
            head_sha: "d4e5f6".into(),
        },
    }
}

pub fn file_change(path: &str, diff: &str) -> FileChange {
    FileChange {
        new_path: Some(path.into()),
        old_path: Some(path.into()),
        diff: diff.into(),
        ..Default::default()
    }
}

/// A well-formed model response with one critical issue anchored at
/// line 1 of src/auth.py.
pub fn review_response_json() -> String {
    r#"{
        "summary": "One security problem.",
        "issues": [{
            "file": "src/auth.py",
            "start_line": 1,
            "end_line": 1,
            "severity": "critical",
            "category": "security",
            "issue": "Password read from query string",
            "explanation": "Query strings end up in access logs.",
            "suggestion_type": "code",
            "code_fix": "password = request.form['pw']"
        }]
    }"#
    .to_string()
}
