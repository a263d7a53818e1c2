//! Provider-independent review core.
//!
//! Every model adapter produces the same raw-text response shape; this
//! module turns it into safely postable inline comments. The pipeline
//! is pure computation: [`normalize`] parses model output into issues,
//! [`line_map`] maps diff positions to new-file line numbers,
//! [`refine`] cross-references the two and downgrades unsafe code
//! suggestions, and [`annotate`] prepares the diff the model sees.

pub mod annotate;
pub mod line_map;
pub mod normalize;
pub mod refine;
pub mod types;
pub mod validate;

pub use annotate::annotate_diff;
pub use line_map::{FileLineMap, build_file_line_maps, build_line_map, generate_line_code};
pub use normalize::normalize_response;
pub use refine::{RefineOutcome, refine_issues};
pub use types::{Category, Issue, ReviewData, Severity, SuggestionType};
