pub mod comment;

pub use comment::{format_inline_comment, format_summary_comment};
