use std::borrow::Cow;
use std::fmt;

/// One `/`-delimited path segment with its matrix parameters.
///
/// `a;x=1;y=2` parses into path `a` and matrix parameters `x=1`, `y=2`.
/// Parameters without `=` are dropped. Rendering reproduces the segment
/// text from the retained parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathSegment {
    path: String,
    matrix: Vec<(String, String)>,
}

impl PathSegment {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(';');
        let path = parts.next().unwrap_or_default().to_string();
        let matrix = parts
            .filter_map(|p| {
                let (name, value) = p.split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        Self { path, matrix }
    }

    /// Segment text without matrix parameters.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn matrix_params(&self) -> &[(String, String)] {
        &self.matrix
    }

    /// All values of the matrix parameter `name`, in order.
    pub fn matrix_param<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.matrix
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-decoded copy (path and matrix names/values).
    #[must_use]
    pub fn decoded(&self) -> Self {
        Self {
            path: decode(&self.path),
            matrix: self
                .matrix
                .iter()
                .map(|(k, v)| (decode(k), decode(v)))
                .collect(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (name, value) in &self.matrix {
            write!(f, ";{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Percent-decode `value`; malformed escapes leave the input untouched.
#[must_use]
pub fn decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => value.to_string(),
    }
}

/// Split a request path (query already removed) into segments.
///
/// A single leading `/` is dropped; the empty path yields one empty segment.
#[must_use]
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.split('/').map(PathSegment::parse).collect()
}

/// Join segments back into a path, keeping matrix parameters.
#[must_use]
pub fn join_segments(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Join segment paths with matrix parameters removed; used for matching.
#[must_use]
pub fn strip_matrix_params(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(PathSegment::path)
        .collect::<Vec<_>>()
        .join("/")
}

/// Remove a single leading `/` from a template or tail.
#[must_use]
pub fn normalize(uri: &str) -> &str {
    uri.strip_prefix('/').unwrap_or(uri)
}
