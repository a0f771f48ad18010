use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::segment::normalize;

/// Default pattern for a `{name}` variable: one segment, lazily matched.
const DEFAULT_VARIABLE_PATTERN: &str = "[^/]+?";

/// Variable names: a word character followed by word characters, dots or dashes.
static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w[\w\.-]*$").expect("variable name regex should be valid"));

/// Failure compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{` without its closing `}`.
    UnclosedVariable { template: String },
    /// Variable name does not match `\w[\w.-]*`.
    InvalidVariableName { template: String, name: String },
    /// The assembled pattern (usually a custom variable regex) is invalid.
    InvalidPattern { template: String, reason: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnclosedVariable { template } => {
                write!(f, "unclosed variable in path template '{}'", template)
            }
            TemplateError::InvalidVariableName { template, name } => {
                write!(
                    f,
                    "invalid variable name '{}' in path template '{}'",
                    name,
                    template
                )
            }
            TemplateError::InvalidPattern { template, reason } => {
                write!(
                    f,
                    "path template '{}' does not compile: {}",
                    template,
                    reason
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

#[derive(Debug)]
enum Token {
    Literal(String),
    Variable { name: String, regex: Option<String> },
}

/// Capture group bound to a template variable.
#[derive(Debug, Clone)]
pub(crate) struct TemplateVariable {
    pub(crate) name: Arc<str>,
    pub(crate) group: usize,
}

/// A compiled path template such as `users/{id}/posts/{slug: [a-z-]+}`.
///
/// The template is normalised (leading `/` removed) and compiled to
/// `^(head)(/.*)?$`, where the head holds escaped literals and one capture
/// group per variable, and the trailing group captures the unmatched tail.
/// The empty template uses `(.*)?` as its tail so it matches any path.
///
/// Ordering ranks templates by specificity: more literal characters first,
/// then more variables, then more variables with custom patterns.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    pattern: Regex,
    literal_chars: usize,
    variables: Vec<TemplateVariable>,
    distinct_variables: usize,
    custom_patterns: usize,
    tail_group: usize,
}

impl UriTemplate {
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let template = normalize(template).to_string();
        let mut tokens = tokenize(&template)?;
        if let Some(Token::Literal(last)) = tokens.last_mut() {
            if last.ends_with('/') {
                last.pop();
            }
        }

        let mut pattern = String::with_capacity(template.len() * 2 + 16);
        pattern.push_str("^(");
        let mut literal_chars = 0;
        let mut variables = Vec::new();
        let mut custom_patterns = 0;
        let mut group = 1;

        for token in tokens {
            match token {
                Token::Literal(literal) => {
                    if literal.is_empty() {
                        continue;
                    }
                    let encoded = encode_literal(&literal);
                    literal_chars += encoded.chars().count();
                    pattern.push_str(&regex::escape(&encoded));
                }
                Token::Variable { name, regex } => {
                    if !VARIABLE_NAME.is_match(&name) {
                        return Err(TemplateError::InvalidVariableName {
                            template: template.clone(),
                            name,
                        });
                    }
                    group += 1;
                    pattern.push('(');
                    match regex {
                        Some(custom) => {
                            custom_patterns += 1;
                            pattern.push_str(&to_non_capturing(&custom));
                        }
                        None => pattern.push_str(DEFAULT_VARIABLE_PATTERN),
                    }
                    pattern.push(')');
                    variables.push(TemplateVariable {
                        name: Arc::from(name.as_str()),
                        group,
                    });
                }
            }
        }
        pattern.push(')');
        pattern.push_str(if template.is_empty() { "(.*)?" } else { "(/.*)?" });
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| TemplateError::InvalidPattern {
            template: template.clone(),
            reason: e.to_string(),
        })?;

        let mut names: Vec<&str> = variables.iter().map(|v| v.name.as_ref()).collect();
        names.sort_unstable();
        names.dedup();
        let distinct_variables = names.len();

        Ok(Self {
            template,
            pattern: regex,
            literal_chars,
            variables,
            distinct_variables,
            custom_patterns,
            tail_group: group + 1,
        })
    }

    /// Normalised template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Compiled regular expression text. Sub-resource methods whose
    /// templates compile to the same pattern are siblings.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn ends_with_slash(&self) -> bool {
        self.template.ends_with('/')
    }

    #[must_use]
    pub fn literal_chars(&self) -> usize {
        self.literal_chars
    }

    /// Number of distinct variable names.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.distinct_variables
    }

    /// Number of variables declared with a custom pattern.
    #[must_use]
    pub fn custom_pattern_count(&self) -> usize {
        self.custom_patterns
    }

    /// Variable names in declaration order (duplicates preserved).
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_ref())
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.pattern
    }

    pub(crate) fn variables(&self) -> &[TemplateVariable] {
        &self.variables
    }

    pub(crate) fn tail_group(&self) -> usize {
        self.tail_group
    }

    /// Specificity comparison; `Greater` means `self` should be tried first.
    #[must_use]
    pub fn compare_specificity(&self, other: &UriTemplate) -> Ordering {
        self.literal_chars
            .cmp(&other.literal_chars)
            .then_with(|| self.distinct_variables.cmp(&other.distinct_variables))
            .then_with(|| self.custom_patterns.cmp(&other.custom_patterns))
    }

    /// Shorthand for building a matcher and running it against `uri`.
    #[must_use]
    pub fn match_uri(self: &Arc<Self>, uri: &str) -> Option<super::UriTemplateMatcher> {
        let mut matcher = super::UriTemplateMatcher::new(Arc::clone(self));
        if matcher.matches(uri) {
            Some(matcher)
        } else {
            None
        }
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn tokenize(template: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }
        // Variable body runs to the matching brace; custom patterns may nest
        // braces as quantifiers, e.g. `{code: [0-9]{3}}`.
        let mut depth = 1;
        let mut body = String::new();
        for (_, inner) in chars.by_ref() {
            match inner {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            body.push(inner);
        }
        if depth != 0 {
            return Err(TemplateError::UnclosedVariable {
                template: template.to_string(),
            });
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        let (name, regex) = match body.split_once(':') {
            Some((name, regex)) => {
                let regex = regex.trim();
                (
                    name.trim().to_string(),
                    if regex.is_empty() {
                        None
                    } else {
                        Some(regex.to_string())
                    },
                )
            }
            None => (body.trim().to_string(), None),
        };
        tokens.push(Token::Variable { name, regex });
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

/// Percent-encode characters that may not appear literally in a path,
/// leaving existing escapes and legal path characters alone.
fn encode_literal(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@/%".contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

/// Rewrite capturing groups in a user pattern as non-capturing so that
/// capture indices stay aligned with template variables.
fn to_non_capturing(regex: &str) -> String {
    let mut out = String::with_capacity(regex.len() + 8);
    let mut chars = regex.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '(' if !in_class && chars.peek() != Some(&'?') => out.push_str("(?:"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> UriTemplate {
        UriTemplate::compile(s).unwrap()
    }

    #[test]
    fn test_normalises_leading_slash() {
        assert_eq!(t("/users/{id}").as_str(), "users/{id}");
        assert_eq!(t("users/{id}").as_str(), "users/{id}");
    }

    #[test]
    fn test_counts() {
        let tpl = t("/users/{id}/posts/{slug: [a-z]+}");
        assert_eq!(tpl.literal_chars(), "users/".len() + "/posts/".len());
        assert_eq!(tpl.variable_count(), 2);
        assert_eq!(tpl.custom_pattern_count(), 1);
        assert_eq!(tpl.variable_names().collect::<Vec<_>>(), vec!["id", "slug"]);
    }

    #[test]
    fn test_trailing_slash_not_counted() {
        let tpl = t("items/");
        assert!(tpl.ends_with_slash());
        assert_eq!(tpl.literal_chars(), "items".len());
    }

    #[test]
    fn test_nested_braces_in_custom_pattern() {
        let tpl = t("codes/{code: [0-9]{3}}");
        assert!(tpl.regex().is_match("codes/123"));
        assert!(!tpl.regex().is_match("codes/12"));
    }

    #[test]
    fn test_custom_groups_become_non_capturing() {
        assert_eq!(to_non_capturing(r"(a|b)\(x\)[(]"), r"(?:a|b)\(x\)[(]");
        let tpl = t("{kind: (cat|dog)}/{name}");
        assert_eq!(tpl.variables()[1].group, 3);
        assert_eq!(tpl.tail_group(), 4);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            UriTemplate::compile("a/{id"),
            Err(TemplateError::UnclosedVariable { .. })
        ));
        assert!(matches!(
            UriTemplate::compile("a/{-id}"),
            Err(TemplateError::InvalidVariableName { .. })
        ));
        assert!(matches!(
            UriTemplate::compile("a/{id: [}"),
            Err(TemplateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_specificity_order() {
        let literal = t("users/me");
        let variable = t("users/{id}");
        let custom = t("users/{id: \\d+}");
        assert_eq!(literal.compare_specificity(&variable), Ordering::Greater);
        assert_eq!(custom.compare_specificity(&variable), Ordering::Greater);
        assert_eq!(
            variable.compare_specificity(&t("users/{name}")),
            Ordering::Equal
        );
        assert_eq!(
            t("a/{x}/{y}").compare_specificity(&t("a/{x}")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_literal_encoding() {
        let tpl = t("hello world");
        assert_eq!(tpl.literal_chars(), "hello%20world".len());
        assert!(tpl.regex().is_match("hello%20world"));
    }
}
