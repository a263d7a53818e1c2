use url::Url;

use crate::error::MrAgentError;

/// Parsed GitLab merge request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMrUrl {
    /// Instance base, e.g. "https://gitlab.example.com".
    pub base_url: String,
    /// Full project path with namespaces, e.g. "group/subgroup/project".
    pub project_path: String,
    pub mr_iid: u64,
}

/// Parse a merge request URL into its components.
///
/// Accepts the modern `/-/merge_requests/<iid>` form as well as the
/// legacy one without the `/-/` separator, on any GitLab host.
pub fn parse_mr_url(mr_url: &str) -> Result<ParsedMrUrl, MrAgentError> {
    let url = Url::parse(mr_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| MrAgentError::InvalidMrUrl(format!("{mr_url}: no host")))?;

    let segments: Vec<&str> = url
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty() && *s != "-")
        .collect();

    let mr_index = segments
        .iter()
        .position(|s| *s == "merge_requests")
        .ok_or_else(|| {
            MrAgentError::InvalidMrUrl(format!("{mr_url}: not a merge request URL"))
        })?;
    if mr_index == 0 {
        return Err(MrAgentError::InvalidMrUrl(format!(
            "{mr_url}: missing project path"
        )));
    }

    let raw_iid = segments.get(mr_index + 1).ok_or_else(|| {
        MrAgentError::InvalidMrUrl(format!("{mr_url}: missing merge request number"))
    })?;
    let mr_iid: u64 = raw_iid.parse().map_err(|_| {
        MrAgentError::InvalidMrUrl(format!("{mr_url}: bad merge request number '{raw_iid}'"))
    })?;
    if mr_iid == 0 {
        return Err(MrAgentError::InvalidMrUrl(format!(
            "{mr_url}: merge request number must be >= 1"
        )));
    }

    let scheme = url.scheme();
    let base_url = match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    };

    Ok(ParsedMrUrl {
        base_url,
        project_path: segments[..mr_index].join("/"),
        mr_iid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_url() {
        let parsed = parse_mr_url("https://gitlab.com/acme/app/-/merge_requests/42").unwrap();
        assert_eq!(parsed.base_url, "https://gitlab.com");
        assert_eq!(parsed.project_path, "acme/app");
        assert_eq!(parsed.mr_iid, 42);
    }

    #[test]
    fn test_parse_nested_groups() {
        let parsed =
            parse_mr_url("https://gitlab.com/group/subgroup/project/-/merge_requests/7").unwrap();
        assert_eq!(parsed.project_path, "group/subgroup/project");
        assert_eq!(parsed.mr_iid, 7);
    }

    #[test]
    fn test_parse_legacy_url_without_dash() {
        let parsed = parse_mr_url("https://gitlab.com/acme/app/merge_requests/3").unwrap();
        assert_eq!(parsed.project_path, "acme/app");
        assert_eq!(parsed.mr_iid, 3);
    }

    #[test]
    fn test_parse_self_hosted_with_port() {
        let parsed =
            parse_mr_url("http://gitlab.internal:8443/team/tool/-/merge_requests/11").unwrap();
        assert_eq!(parsed.base_url, "http://gitlab.internal:8443");
        assert_eq!(parsed.project_path, "team/tool");
    }

    #[test]
    fn test_rejects_non_mr_urls() {
        assert!(parse_mr_url("https://gitlab.com/acme/app").is_err());
        assert!(parse_mr_url("https://gitlab.com/acme/app/-/issues/4").is_err());
        assert!(parse_mr_url("https://gitlab.com/acme/app/-/merge_requests/abc").is_err());
        assert!(parse_mr_url("https://gitlab.com/acme/app/-/merge_requests/0").is_err());
        assert!(parse_mr_url("not a url").is_err());
    }
}
