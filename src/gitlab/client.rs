use reqwest::Client;
use serde_json::{Value, json};

use crate::config::loader::get_settings;
use crate::error::MrAgentError;
use crate::gitlab::types::{DiffRefs, MrChanges, MrDetails};
use crate::gitlab::url_parser::{ParsedMrUrl, parse_mr_url};

/// GitLab REST v4 client scoped to one project and one merge request.
pub struct GitlabClient {
    client: Client,
    /// `{instance}/api/v4/projects/{encoded-path}`.
    base_url: String,
    token: String,
    pub mr_iid: u64,
}

impl GitlabClient {
    /// Create a client from a merge request URL. The instance host comes
    /// from the URL itself so self-hosted GitLab works without extra
    /// configuration; the token comes from settings.
    pub fn from_mr_url(mr_url: &str) -> Result<Self, MrAgentError> {
        let parsed = parse_mr_url(mr_url)?;
        Self::new(&parsed)
    }

    pub fn new(parsed: &ParsedMrUrl) -> Result<Self, MrAgentError> {
        let settings = get_settings();
        let token = settings.gitlab.personal_access_token.clone();
        if token.is_empty() {
            return Err(MrAgentError::Gitlab(
                "no GitLab token configured (set GITLAB_TOKEN or gitlab.personal_access_token)"
                    .into(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MrAgentError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/api/v4/projects/{}",
                parsed.base_url,
                encode_project_path(&parsed.project_path)
            ),
            token,
            mr_iid: parsed.mr_iid,
        })
    }

    /// Fetch merge request details.
    pub async fn get_merge_request(&self) -> Result<MrDetails, MrAgentError> {
        let url = format!("{}/merge_requests/{}", self.base_url, self.mr_iid);
        let resp = self.get(&url).await?;
        Ok(resp.json().await?)
    }

    /// Fetch merge request details together with the per-file diffs.
    pub async fn get_merge_request_changes(&self) -> Result<MrChanges, MrAgentError> {
        let url = format!("{}/merge_requests/{}/changes", self.base_url, self.mr_iid);
        let resp = self.get(&url).await?;
        Ok(resp.json().await?)
    }

    /// Post a general (non-positioned) comment on the MR.
    pub async fn post_comment(&self, body: &str) -> Result<(), MrAgentError> {
        let url = format!("{}/merge_requests/{}/notes", self.base_url, self.mr_iid);
        self.post(&url, &json!({ "body": body })).await?;
        Ok(())
    }

    /// Post an inline discussion on a file position.
    ///
    /// With both line codes present and a real range, the discussion
    /// spans `start_line..=end_line`. If GitLab rejects the `line_range`
    /// position (stale line codes happen when the MR moved underneath
    /// us), the comment is retried anchored to `start_line` alone.
    pub async fn post_inline_comment(
        &self,
        diff_refs: &DiffRefs,
        file_path: &str,
        start_line: u32,
        end_line: u32,
        line_code_start: Option<&str>,
        line_code_end: Option<&str>,
        body: &str,
    ) -> Result<(), MrAgentError> {
        let url = format!(
            "{}/merge_requests/{}/discussions",
            self.base_url, self.mr_iid
        );
        let position = build_position(
            diff_refs,
            file_path,
            start_line,
            end_line,
            line_code_start,
            line_code_end,
        );
        let is_range = position.get("line_range").is_some();

        let payload = json!({ "body": body, "position": position });
        match self.post(&url, &payload).await {
            Ok(_) => Ok(()),
            Err(err) if is_range => {
                tracing::warn!(
                    file = file_path,
                    start_line,
                    end_line,
                    error = %err,
                    "multi-line position rejected, retrying as single line"
                );
                let fallback =
                    build_position(diff_refs, file_path, start_line, start_line, None, None);
                self.post(&url, &json!({ "body": body, "position": fallback }))
                    .await?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, MrAgentError> {
        let resp = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        check_status(resp).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, MrAgentError> {
        let resp = self
            .client
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, MrAgentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 429 {
        let retry_after_secs = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(MrAgentError::RateLimited { retry_after_secs });
    }
    let text = resp.text().await.unwrap_or_default();
    Err(MrAgentError::Gitlab(format!("{status}: {text}")))
}

/// URL-encode a project path for the projects API (`a/b` -> `a%2Fb`).
fn encode_project_path(path: &str) -> String {
    path.replace('/', "%2F")
}

/// Build the discussion `position` object.
///
/// Multi-line positions need the GitLab line codes for both ends; when
/// either is missing the position silently degrades to single-line at
/// `start_line`.
fn build_position(
    diff_refs: &DiffRefs,
    file_path: &str,
    start_line: u32,
    end_line: u32,
    line_code_start: Option<&str>,
    line_code_end: Option<&str>,
) -> Value {
    let mut position = json!({
        "base_sha": diff_refs.base_sha,
        "start_sha": diff_refs.start_sha,
        "head_sha": diff_refs.head_sha,
        "position_type": "text",
        "new_path": file_path,
        "old_path": file_path,
    });

    let map = position.as_object_mut().unwrap();
    match (line_code_start, line_code_end) {
        (Some(start_code), Some(end_code)) if start_line != end_line => {
            map.insert(
                "line_range".into(),
                json!({
                    "start": { "line_code": start_code, "type": "new" },
                    "end": { "line_code": end_code, "type": "new" },
                }),
            );
            map.insert("new_line".into(), json!(end_line));
        }
        _ => {
            map.insert("new_line".into(), json!(start_line));
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> DiffRefs {
        DiffRefs {
            base_sha: "aaa".into(),
            start_sha: "bbb".into(),
            head_sha: "ccc".into(),
        }
    }

    #[test]
    fn test_encode_project_path() {
        assert_eq!(encode_project_path("acme/app"), "acme%2Fapp");
        assert_eq!(encode_project_path("g/sub/app"), "g%2Fsub%2Fapp");
    }

    #[test]
    fn test_single_line_position() {
        let pos = build_position(&refs(), "src/a.py", 5, 5, None, None);
        assert_eq!(pos["new_line"], 5);
        assert_eq!(pos["position_type"], "text");
        assert_eq!(pos["new_path"], "src/a.py");
        assert!(pos.get("line_range").is_none());
    }

    #[test]
    fn test_multi_line_position_with_codes() {
        let pos = build_position(&refs(), "src/a.py", 5, 8, Some("code_5_5"), Some("code_8_8"));
        assert_eq!(pos["line_range"]["start"]["line_code"], "code_5_5");
        assert_eq!(pos["line_range"]["end"]["line_code"], "code_8_8");
        assert_eq!(pos["line_range"]["start"]["type"], "new");
        // The range anchor ends at the last line.
        assert_eq!(pos["new_line"], 8);
    }

    #[test]
    fn test_range_without_codes_degrades_to_single_line() {
        let pos = build_position(&refs(), "src/a.py", 5, 8, None, None);
        assert!(pos.get("line_range").is_none());
        assert_eq!(pos["new_line"], 5);
    }

    #[test]
    fn test_equal_range_stays_single_line() {
        let pos = build_position(&refs(), "src/a.py", 5, 5, Some("c"), Some("c"));
        assert!(pos.get("line_range").is_none());
        assert_eq!(pos["new_line"], 5);
    }
}
