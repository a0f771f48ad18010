//! # URI Module
//!
//! Path templates, match attempts and the path-segment views they operate on.
//!
//! A request path has two parallel, index-aligned views:
//!
//! - the [`PathSegment`] list, which keeps matrix parameters verbatim and is
//!   what parameter binding and "matched URIs" introspection read from;
//! - the stripped path (segment paths joined by `/`, see
//!   [`strip_matrix_params`]), which is what templates are matched against.
//!
//! [`UriTemplateMatcher::store_variables_path_segments`] maps variable
//! offsets in the stripped view back onto the original segments.

mod matcher;
mod segment;
mod template;

use smallvec::SmallVec;
use std::sync::Arc;

pub use matcher::UriTemplateMatcher;
pub use segment::{
    decode, join_segments, normalize, parse_path, strip_matrix_params, PathSegment,
};
pub use template::{TemplateError, UriTemplate};

/// Ordered variable bindings: `(name, value)`. Later bindings shadow earlier ones.
pub type ParamVec = SmallVec<[(Arc<str>, String); 8]>;

/// Ordered variable → spanned request segments bindings.
pub type SegmentVec = SmallVec<[(Arc<str>, Vec<PathSegment>); 4]>;
