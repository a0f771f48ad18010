use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::metadata::{MethodMetadata, ParamValue};
use crate::registry::{ResourceInstance, SubResourceInstance};
use crate::server::Request;
use crate::uri::{
    decode, join_segments, parse_path, ParamVec, PathSegment, SegmentVec, UriTemplateMatcher,
};

/// The method a search settled on.
#[derive(Debug, Clone)]
pub enum FoundMethod {
    /// Method without a path on an exactly matched resource.
    Resource(Arc<MethodMetadata>),
    SubResourceMethod(SubResourceInstance),
    /// A locator that was invoked on the way to the final method.
    Locator(SubResourceInstance),
}

impl FoundMethod {
    #[must_use]
    pub fn metadata(&self) -> &Arc<MethodMetadata> {
        match self {
            FoundMethod::Resource(method) => method,
            FoundMethod::SubResourceMethod(sub) | FoundMethod::Locator(sub) => sub.metadata(),
        }
    }
}

/// What matching has accumulated so far: variables, consumed URIs and the
/// chain of resources, each list ordered newest first.
///
/// Backtracking restores a saved clone; the resource instances are shared
/// through `Arc` so a restore never duplicates a live object.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedData {
    matched_variables: ParamVec,
    variable_segments: SegmentVec,
    matched_uris: VecDeque<Vec<PathSegment>>,
    matched_resources: VecDeque<Arc<ResourceInstance>>,
}

impl AccumulatedData {
    /// Record `head` (the consumed part of the stripped path) as the next
    /// matched URI. Returns how many request segments it spans.
    ///
    /// The stored URI takes the corresponding request segments, so matrix
    /// parameters survive, and is prefixed with the previous matched URI.
    pub fn add_matched_uri(&mut self, head: &str, segments: &[PathSegment]) -> usize {
        let count = if head.is_empty() {
            0
        } else {
            parse_path(head).len()
        };
        let offset = self.consumed_segments();

        let start = offset.min(segments.len());
        let end = (offset + count).min(segments.len());
        let mut consumed: Vec<PathSegment> = segments[start..end].to_vec();
        if consumed.is_empty() {
            consumed.push(PathSegment::default());
        }

        let uri = match self.matched_uris.front() {
            Some(previous) => {
                let mut joined = previous.clone();
                joined.extend(consumed);
                joined
            }
            None => consumed,
        };
        self.matched_uris.push_front(uri);
        count
    }

    /// Store the request segments spanned by each variable of `matcher`.
    pub(crate) fn store_variable_segments(
        &mut self,
        matcher: &UriTemplateMatcher,
        segments: &[PathSegment],
        offset: usize,
        count: usize,
    ) {
        matcher.store_variables_path_segments(segments, offset, count, &mut self.variable_segments);
    }

    /// Store the variables of `matcher`, still encoded.
    pub(crate) fn store_variables(&mut self, matcher: &UriTemplateMatcher) {
        matcher.store_variables(&mut self.matched_variables, false);
    }

    /// Request segments consumed so far. Empty segments contributed by
    /// templates matching the empty string are not counted.
    #[must_use]
    pub fn consumed_segments(&self) -> usize {
        self.matched_uris.front().map_or(0, |first| {
            first.iter().filter(|s| !s.path().is_empty()).count()
        })
    }

    /// Encoded value of path variable `name`; a deeper binding shadows an
    /// outer one with the same name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.matched_variables
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Request segments spanned by path variable `name`, matrix parameters
    /// intact.
    #[must_use]
    pub fn matched_variable_segments(&self, name: &str) -> Option<&[PathSegment]> {
        self.variable_segments
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_slice())
    }

    #[must_use]
    pub fn matched_variables(&self) -> &ParamVec {
        &self.matched_variables
    }

    /// Matched URIs, newest (longest) first, with matrix parameters.
    #[must_use]
    pub fn matched_uris(&self, decode_values: bool) -> Vec<String> {
        self.matched_uris
            .iter()
            .map(|segments| {
                let joined = join_segments(segments);
                if decode_values {
                    decode(&joined)
                } else {
                    joined
                }
            })
            .collect()
    }

    /// Newest matched URI as segments; the last entry is the segment the
    /// innermost match ended on.
    #[must_use]
    pub fn last_matched_uri(&self) -> Option<&[PathSegment]> {
        self.matched_uris.front().map(Vec::as_slice)
    }

    /// Resource chain, newest first.
    #[must_use]
    pub fn matched_resources(&self) -> &VecDeque<Arc<ResourceInstance>> {
        &self.matched_resources
    }

    /// Resource whose methods are being searched.
    #[must_use]
    pub fn current_resource(&self) -> Option<&Arc<ResourceInstance>> {
        self.matched_resources.front()
    }

    pub(crate) fn push_resource(&mut self, resource: Arc<ResourceInstance>) {
        self.matched_resources.push_front(resource);
    }

    /// Release every resource not present in `saved`.
    pub(crate) fn release_beyond(&self, saved: &AccumulatedData, request: &Request) {
        for resource in &self.matched_resources {
            if !saved.matched_resources.iter().any(|r| Arc::ptr_eq(r, resource)) {
                resource.release(request);
            }
        }
    }

    /// Release the whole chain.
    pub(crate) fn release_all(&self, request: &Request) {
        for resource in &self.matched_resources {
            resource.release(request);
        }
    }
}

/// Outcome of resource and method search for one request.
#[derive(Default)]
pub struct SearchResult {
    pub(crate) found: bool,
    pub(crate) error: Option<DispatchError>,
    pub(crate) method: Option<FoundMethod>,
    pub(crate) params: Vec<ParamValue>,
    pub(crate) data: AccumulatedData,
}

impl SearchResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Error of the last failed attempt, kept while no method is found.
    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn method(&self) -> Option<&FoundMethod> {
        self.method.as_ref()
    }

    /// Bound invocation arguments, in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamValue] {
        &self.params
    }

    #[must_use]
    pub fn data(&self) -> &AccumulatedData {
        &self.data
    }

    pub(crate) fn set_error(&mut self, error: DispatchError) {
        self.found = false;
        self.error = Some(error);
    }

    pub(crate) fn set_found(&mut self, method: FoundMethod) {
        self.found = true;
        self.error = None;
        self.method = Some(method);
    }

    /// Request-scoped view handed to `UriInfo` context parameters.
    #[must_use]
    pub fn uri_info(&self, request: &Request) -> UriInfo {
        UriInfo {
            path: request.path().to_string(),
            matched_uris: self.data.matched_uris.iter().cloned().collect(),
            matched_resources: self.data.matched_resources.iter().cloned().collect(),
            path_parameters: self.data.matched_variables.clone(),
        }
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("found", &self.found)
            .field("error", &self.error)
            .field("method", &self.method.as_ref().map(|m| m.metadata().name()))
            .field("resources", &self.data.matched_resources.len())
            .finish()
    }
}

/// Snapshot of the match taken when a parameter asks for it.
///
/// Lists are ordered newest first: the resource or URI matched last (the
/// one whose method receives this value) comes first.
#[derive(Debug, Clone)]
pub struct UriInfo {
    path: String,
    matched_uris: Vec<Vec<PathSegment>>,
    matched_resources: Vec<Arc<ResourceInstance>>,
    path_parameters: ParamVec,
}

impl UriInfo {
    /// Request path without the leading `/`.
    #[must_use]
    pub fn path(&self, decode_values: bool) -> String {
        let path = self.path.strip_prefix('/').unwrap_or(&self.path);
        if decode_values {
            decode(path)
        } else {
            path.to_string()
        }
    }

    #[must_use]
    pub fn matched_uris(&self, decode_values: bool) -> Vec<String> {
        self.matched_uris
            .iter()
            .map(|segments| {
                let joined = join_segments(segments);
                if decode_values {
                    decode(&joined)
                } else {
                    joined
                }
            })
            .collect()
    }

    #[must_use]
    pub fn matched_resources(&self) -> &[Arc<ResourceInstance>] {
        &self.matched_resources
    }

    /// Class names of the matched resources.
    #[must_use]
    pub fn matched_resource_names(&self) -> Vec<&str> {
        self.matched_resources.iter().map(|r| r.name()).collect()
    }

    /// Path parameters in binding order; a name may repeat across depths.
    #[must_use]
    pub fn path_parameters(&self, decode_values: bool) -> Vec<(String, String)> {
        self.path_parameters
            .iter()
            .map(|(name, value)| {
                let value = if decode_values {
                    decode(value)
                } else {
                    value.clone()
                };
                (name.to_string(), value)
            })
            .collect()
    }

    /// Decoded value of `name`; the deepest binding wins.
    #[must_use]
    pub fn path_parameter(&self, name: &str) -> Option<String> {
        self.path_parameters
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| decode(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_uris_accumulate_newest_first() {
        let segments = parse_path("/library;branch=main/books/42;edition=2");
        let mut data = AccumulatedData::default();

        assert_eq!(data.add_matched_uri("library", &segments), 1);
        assert_eq!(data.add_matched_uri("books/42", &segments), 2);

        assert_eq!(
            data.matched_uris(false),
            vec![
                "library;branch=main/books/42;edition=2".to_string(),
                "library;branch=main".to_string(),
            ]
        );
        assert_eq!(data.consumed_segments(), 3);
    }

    #[test]
    fn test_empty_head_records_empty_uri() {
        let segments = parse_path("/a/b");
        let mut data = AccumulatedData::default();
        assert_eq!(data.add_matched_uri("", &segments), 0);
        assert_eq!(data.matched_uris(false), vec![String::new()]);
        // The empty root segment does not shift later offsets.
        assert_eq!(data.add_matched_uri("a", &segments), 1);
        assert_eq!(data.matched_uris(false)[0], "/a");
    }

    #[test]
    fn test_variable_lookup_prefers_deepest() {
        let outer = Arc::new(crate::uri::UriTemplate::compile("org/{id}").unwrap());
        let inner = Arc::new(crate::uri::UriTemplate::compile("users/{id}").unwrap());
        let mut data = AccumulatedData::default();
        data.store_variables(&outer.match_uri("org/7").unwrap());
        data.store_variables(&inner.match_uri("users/a%20b").unwrap());
        assert_eq!(data.variable("id"), Some("a%20b"));
        assert_eq!(data.variable("missing"), None);
    }

    #[test]
    fn test_found_and_error_are_exclusive() {
        let mut result = SearchResult::new();
        result.set_error(DispatchError::NotFound);
        assert!(!result.is_found());
        assert!(result.error().is_some());

        let method = Arc::new(MethodMetadata::handler(
            "get",
            http::Method::GET,
            |_: &(), _| Ok(crate::entity::Outcome::Empty),
        ));
        result.set_found(FoundMethod::Resource(method));
        assert!(result.is_found());
        assert!(result.error().is_none());
        assert_eq!(result.method().map(|m| m.metadata().name()), Some("get"));
    }
}
