//! Dispatch error taxonomy.
//!
//! Every failure the dispatch engine can surface maps to one HTTP status and
//! carries enough data to render its default wire response. Failures raised
//! while trying one candidate sub-resource are recovered by backtracking; only
//! the last candidate's error escapes.

use http::header::{HeaderValue, ALLOW};
use http::{Method, StatusCode};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::entity::ResponseEnvelope;

/// Structured dispatch failure mirroring the response that will be sent.
#[derive(Debug, Clone)]
pub enum DispatchError {
    /// No root or sub-resource template matched the request path.
    NotFound,
    /// The path matched but no method accepts the request verb.
    MethodNotAllowed {
        /// Verbs declared by the matching methods, used for the `Allow` header.
        allow: Vec<Method>,
    },
    /// No method consumes the request content type.
    UnsupportedMediaType,
    /// No method (or response writer) can produce an acceptable type.
    NotAcceptable,
    /// A parameter value could not be converted.
    BadRequest { reason: String },
    /// Internal dispatch failure, e.g. no writer for the response entity.
    Internal { reason: String },
    /// Unexpected failure raised by application code.
    Application(Arc<dyn StdError + Send + Sync>),
    /// Exact response requested by application code or a parameter converter.
    Web(ResponseEnvelope),
}

impl DispatchError {
    /// Wrap an application error.
    pub fn application<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DispatchError::Application(Arc::new(err))
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        DispatchError::Internal {
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        DispatchError::BadRequest {
            reason: reason.into(),
        }
    }

    /// Build a 405 from an arbitrary verb collection; duplicates are removed
    /// and the list is ordered so the `Allow` header is stable.
    pub fn method_not_allowed<I>(verbs: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let mut allow: Vec<Method> = Vec::new();
        for verb in verbs {
            if !allow.contains(&verb) {
                allow.push(verb);
            }
        }
        allow.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        DispatchError::MethodNotAllowed { allow }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DispatchError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            DispatchError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            DispatchError::Internal { .. } | DispatchError::Application(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::Web(envelope) => {
                envelope.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    /// Comma separated `Allow` value, present only for 405.
    #[must_use]
    pub fn allow_header(&self) -> Option<HeaderValue> {
        match self {
            DispatchError::MethodNotAllowed { allow } => {
                let joined = allow
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                HeaderValue::from_str(&joined).ok()
            }
            _ => None,
        }
    }

    /// Default response for this error when no exception mapper applies.
    #[must_use]
    pub fn to_envelope(&self) -> ResponseEnvelope {
        match self {
            DispatchError::Web(envelope) => envelope.clone(),
            other => {
                let mut envelope = ResponseEnvelope::status(other.status());
                if let Some(allow) = other.allow_header() {
                    envelope.headers.insert(ALLOW, allow);
                }
                envelope
            }
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound => write!(f, "no resource matches the request path"),
            DispatchError::MethodNotAllowed { allow } => {
                let verbs: Vec<&str> = allow.iter().map(Method::as_str).collect();
                write!(f, "method not allowed (allow: {})", verbs.join(", "))
            }
            DispatchError::UnsupportedMediaType => {
                write!(f, "no method consumes the request content type")
            }
            DispatchError::NotAcceptable => {
                write!(f, "no acceptable response media type could be produced")
            }
            DispatchError::BadRequest { reason } => write!(f, "bad request: {}", reason),
            DispatchError::Internal { reason } => write!(f, "internal dispatch error: {}", reason),
            DispatchError::Application(err) => write!(f, "application error: {}", err),
            DispatchError::Web(envelope) => match envelope.status {
                Some(status) => write!(f, "web application response {}", status),
                None => write!(f, "web application response"),
            },
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DispatchError::Application(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_dedupes_and_sorts() {
        let err = DispatchError::method_not_allowed(vec![
            Method::PUT,
            Method::GET,
            Method::PUT,
            Method::DELETE,
        ]);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = err.allow_header().unwrap();
        assert_eq!(allow.to_str().unwrap(), "DELETE, GET, PUT");
        let envelope = err.to_envelope();
        assert_eq!(envelope.headers.get(ALLOW), Some(&allow));
    }

    #[test]
    fn test_statuses() {
        assert_eq!(DispatchError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DispatchError::UnsupportedMediaType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            DispatchError::NotAcceptable.status(),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            DispatchError::bad_request("x").status(),
            StatusCode::BAD_REQUEST
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let app = DispatchError::application(io);
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(app.source().is_some());
        assert!(app.to_string().contains("boom"));
    }

    #[test]
    fn test_web_error_keeps_envelope() {
        let err = DispatchError::Web(ResponseEnvelope::status(StatusCode::CONFLICT));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_envelope().status, Some(StatusCode::CONFLICT));
    }
}
