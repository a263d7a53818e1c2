use serde::{Deserialize, Serialize};

/// One changed file from the `/merge_requests/:iid/changes` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChange {
    pub new_path: Option<String>,
    pub old_path: Option<String>,
    /// Unified diff text for this file (no `diff --git` preamble).
    pub diff: String,
    pub new_file: bool,
    pub deleted_file: bool,
    pub renamed_file: bool,
}

impl FileChange {
    /// Path used to key line maps and comments: the new path, falling
    /// back to the old one for deleted files.
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}

/// SHAs anchoring a positioned discussion on the MR diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffRefs {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
}

/// Merge request details from the `/merge_requests/:iid` endpoint.
/// Only the fields the reviewer consumes; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MrDetails {
    pub iid: u64,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub state: String,
    pub web_url: String,
    pub diff_refs: DiffRefs,
}

/// Response shape of the `/changes` endpoint: MR details plus the
/// per-file diff list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MrChanges {
    #[serde(flatten)]
    pub details: MrDetails,
    pub changes: Vec<FileChange>,
}
