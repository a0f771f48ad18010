use std::sync::Arc;

use super::segment::{decode, PathSegment};
use super::template::UriTemplate;
use super::{ParamVec, SegmentVec};

/// A single match attempt of one template against one path.
///
/// Call [`matches`](Self::matches) once; the accessors describe that attempt.
/// Accessors on a failed attempt return empty values rather than panicking.
#[derive(Debug, Clone)]
pub struct UriTemplateMatcher {
    template: Arc<UriTemplate>,
    uri: String,
    groups: Vec<Option<(usize, usize)>>,
    matched: bool,
}

impl UriTemplateMatcher {
    #[must_use]
    pub fn new(template: Arc<UriTemplate>) -> Self {
        Self {
            template,
            uri: String::new(),
            groups: Vec::new(),
            matched: false,
        }
    }

    /// Full match of `uri` against the template.
    pub fn matches(&mut self, uri: &str) -> bool {
        self.uri = uri.to_string();
        self.groups.clear();
        self.matched = match self.template.regex().captures(uri) {
            Some(caps) => {
                self.groups = (0..caps.len())
                    .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                    .collect();
                true
            }
            None => false,
        };
        self.matched
    }

    #[must_use]
    pub fn template(&self) -> &Arc<UriTemplate> {
        &self.template
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    fn group(&self, index: usize) -> Option<&str> {
        let (start, end) = (*self.groups.get(index)?)?;
        self.uri.get(start..end)
    }

    /// Unmatched remainder of the path (still percent-encoded).
    #[must_use]
    pub fn tail(&self) -> &str {
        self.group(self.template.tail_group()).unwrap_or("")
    }

    /// True when nothing (or only a trailing `/`) is left unmatched.
    #[must_use]
    pub fn is_exact_match(&self) -> bool {
        if !self.matched {
            return false;
        }
        let tail = self.tail();
        tail.is_empty() || tail == "/"
    }

    /// Consumed prefix of the path (still percent-encoded). A template with a
    /// trailing `/` also consumes a trailing `/` tail.
    #[must_use]
    pub fn head(&self) -> String {
        let mut head = self.group(1).unwrap_or("").to_string();
        if self.template.ends_with_slash() && self.tail() == "/" {
            head.push('/');
        }
        head
    }

    /// Variable bindings as `(name, value, start offset)` in template order.
    fn bindings(&self) -> impl Iterator<Item = (&Arc<str>, &str, usize)> {
        self.template.variables().iter().filter_map(move |var| {
            let (start, end) = (*self.groups.get(var.group)?)?;
            Some((&var.name, self.uri.get(start..end)?, start))
        })
    }

    /// First value bound to `name`.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.bindings()
            .find(|(n, _, _)| n.as_ref() == name)
            .map(|(_, v, _)| v)
    }

    /// Append every variable binding to `out`, optionally percent-decoded.
    pub fn store_variables(&self, out: &mut ParamVec, decode_values: bool) {
        for (name, value, _) in self.bindings() {
            let value = if decode_values {
                decode(value)
            } else {
                value.to_string()
            };
            out.push((Arc::clone(name), value));
        }
    }

    /// Append, for every variable, the request segments its value spans.
    ///
    /// `segments[offset..offset + count]` are the original segments (matrix
    /// parameters intact) that this match consumed; variable offsets within
    /// the matched path are mapped back onto them.
    pub fn store_variables_path_segments(
        &self,
        segments: &[PathSegment],
        offset: usize,
        count: usize,
        out: &mut SegmentVec,
    ) {
        for (name, value, start) in self.bindings() {
            let spanned = spanned_segments(segments, offset, count, start, value.len());
            out.push((Arc::clone(name), spanned));
        }
    }
}

fn spanned_segments(
    segments: &[PathSegment],
    offset: usize,
    count: usize,
    start: usize,
    len: usize,
) -> Vec<PathSegment> {
    let mut spanned = Vec::new();
    let end = (offset + count).min(segments.len());
    let mut path_length = 0;
    let mut index = offset;
    while index < end {
        path_length += segments[index].path().len();
        if start < path_length {
            let value_end = (start + len).saturating_sub(1);
            let mut last = index;
            while value_end > path_length && last + 1 < segments.len() {
                last += 1;
                path_length += segments[last].path().len() + 1;
            }
            spanned.extend(segments[index..=last].iter().cloned());
            break;
        } else if start == path_length {
            spanned.push(segments[index].clone());
            break;
        }
        // separator
        path_length += 1;
        index += 1;
    }
    spanned
}
