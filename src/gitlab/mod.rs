pub mod client;
pub mod types;
pub mod url_parser;

pub use client::GitlabClient;
pub use types::{DiffRefs, FileChange, MrChanges, MrDetails};
pub use url_parser::{ParsedMrUrl, parse_mr_url};
