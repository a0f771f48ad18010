use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const WILDCARD: &str = "*";

/// Error produced when a media type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeParseError {
    /// Input was empty or whitespace only.
    Empty,
    /// The `type/subtype` part is malformed.
    InvalidEssence { value: String },
    /// A parameter lacks `=` or has an empty name.
    InvalidParameter { value: String },
}

impl fmt::Display for MediaTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTypeParseError::Empty => write!(f, "empty media type"),
            MediaTypeParseError::InvalidEssence { value } => {
                write!(f, "invalid media type '{}': expected type/subtype", value)
            }
            MediaTypeParseError::InvalidParameter { value } => {
                write!(f, "invalid media type parameter '{}'", value)
            }
        }
    }
}

impl std::error::Error for MediaTypeParseError {}

/// A parsed `type/subtype;param=value` media type.
///
/// Type and subtype are stored lower-cased; parameter names are lower-cased
/// and parameter values kept verbatim (quotes stripped).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// `*/*`
    #[must_use]
    pub fn wildcard() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    #[must_use]
    pub fn application_octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    #[must_use]
    pub fn application_json() -> Self {
        Self::new("application", "json")
    }

    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    pub fn parse(value: &str) -> Result<Self, MediaTypeParseError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(MediaTypeParseError::Empty);
        }
        let mut parts = value.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        let (type_, subtype) = if essence == WILDCARD {
            (WILDCARD, WILDCARD)
        } else {
            match essence.split_once('/') {
                Some((t, s)) if !t.trim().is_empty() && !s.trim().is_empty() => {
                    (t.trim(), s.trim())
                }
                _ => {
                    return Err(MediaTypeParseError::InvalidEssence {
                        value: value.to_string(),
                    })
                }
            }
        };
        if subtype.contains('/') {
            return Err(MediaTypeParseError::InvalidEssence {
                value: value.to_string(),
            });
        }
        let mut media_type = Self::new(type_, subtype);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            match param.split_once('=') {
                Some((name, val)) if !name.trim().is_empty() => {
                    let val = val.trim().trim_matches('"');
                    media_type
                        .params
                        .push((name.trim().to_ascii_lowercase(), val.to_string()));
                }
                _ => {
                    return Err(MediaTypeParseError::InvalidParameter {
                        value: param.to_string(),
                    })
                }
            }
        }
        Ok(media_type)
    }

    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) a parameter.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.params.retain(|(k, _)| *k != name);
        self.params.push((name, value.to_string()));
        self
    }

    #[must_use]
    pub fn without_param(mut self, name: &str) -> Self {
        self.params.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    /// Copy of this type without any parameters.
    #[must_use]
    pub fn essence(&self) -> Self {
        Self::new(&self.type_, &self.subtype)
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// Quality factor from the `q` parameter; 1.0 when absent or unparsable.
    #[must_use]
    pub fn quality(&self) -> f32 {
        self.param("q")
            .and_then(|q| q.trim().parse::<f32>().ok())
            .map(|q| q.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }

    /// Symmetric compatibility: either side may carry wildcards.
    #[must_use]
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        self.is_wildcard_subtype() || other.is_wildcard_subtype() || self.subtype == other.subtype
    }

    /// One-sided compatibility: only `self` may carry wildcards.
    /// `text/*` covers `text/plain`, but `text/plain` does not cover `text/*`.
    #[must_use]
    pub fn covers(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        self.type_ == other.type_ && (self.is_wildcard_subtype() || self.subtype == other.subtype)
    }

    /// Ignores parameters.
    #[must_use]
    pub fn same_essence(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    /// Specificity ordering `n/m > n/* > */*`; subtype decides first, then type.
    #[must_use]
    pub fn compare_specificity(&self, other: &MediaType) -> Ordering {
        compare_part(&self.subtype, &other.subtype)
            .then_with(|| compare_part(&self.type_, &other.type_))
    }
}

fn compare_part(a: &str, b: &str) -> Ordering {
    match (a == WILDCARD, b == WILDCARD) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaType::parse(s)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{}={}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    #[test]
    fn test_parse_with_params() {
        let m = mt("Text/HTML; charset=\"UTF-8\" ;q=0.3");
        assert_eq!(m.type_(), "text");
        assert_eq!(m.subtype(), "html");
        assert_eq!(m.param("charset"), Some("UTF-8"));
        assert!((m.quality() - 0.3).abs() < f32::EPSILON);
        assert_eq!(m.to_string(), "text/html;charset=UTF-8;q=0.3");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(MediaType::parse("  "), Err(MediaTypeParseError::Empty));
        assert!(matches!(
            MediaType::parse("text"),
            Err(MediaTypeParseError::InvalidEssence { .. })
        ));
        assert!(matches!(
            MediaType::parse("text/plain;charset"),
            Err(MediaTypeParseError::InvalidParameter { .. })
        ));
        assert_eq!(mt("*"), MediaType::wildcard());
    }

    #[test]
    fn test_compatibility_is_symmetric() {
        assert!(mt("text/*").is_compatible(&mt("text/plain")));
        assert!(mt("text/plain").is_compatible(&mt("text/*")));
        assert!(mt("*/*").is_compatible(&mt("image/png")));
        assert!(!mt("text/plain").is_compatible(&mt("text/html")));
        assert!(!mt("text/*").is_compatible(&mt("application/json")));
    }

    #[test]
    fn test_covers_is_one_sided() {
        assert!(mt("text/*").covers(&mt("text/plain")));
        assert!(!mt("text/plain").covers(&mt("text/*")));
        assert!(mt("*/*").covers(&mt("text/*")));
    }

    #[test]
    fn test_specificity_ordering() {
        assert_eq!(
            mt("text/plain").compare_specificity(&mt("text/*")),
            Ordering::Greater
        );
        assert_eq!(
            mt("text/*").compare_specificity(&mt("*/*")),
            Ordering::Greater
        );
        assert_eq!(
            mt("text/plain").compare_specificity(&mt("application/json")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_param_editing() {
        let m = mt("application/json;q=0.5").without_param("q").with_param("charset", "utf-8");
        assert_eq!(m.to_string(), "application/json;charset=utf-8");
        assert_eq!(m.essence(), MediaType::application_json());
    }
}
