use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::media::{Accept, MediaType};
use crate::uri::{parse_path, PathSegment};

/// Transport-neutral view of an inbound request.
///
/// The path is kept percent-encoded; [`segments`](Self::segments) is the
/// parsed segment list (matrix parameters intact) that matching and
/// parameter binding work from.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Vec<u8>,
    segments: Vec<PathSegment>,
    request_id: RequestId,
}

impl Request {
    /// Build from a method and request target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method,
            segments: parse_path(path),
            path: path.to_string(),
            query: query.to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            request_id: RequestId::new(),
        }
    }

    /// Convert an `http::Request`; an `x-request-id` header is reused when it
    /// holds a valid ULID.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let mut request = Self::new(parts.method, &target);
        request.request_id = RequestId::from_header_or_new(
            parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
        );
        request.headers = parts.headers;
        request.body = body;
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Used by the HEAD fallback to re-run the search as GET.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Percent-encoded path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// First value of a header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All textual values of a header.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Declared request body type, if any.
    pub fn content_type(&self) -> Result<Option<MediaType>, DispatchError> {
        match self.headers.get(CONTENT_TYPE) {
            None => Ok(None),
            Some(value) => {
                let text = value
                    .to_str()
                    .map_err(|_| DispatchError::bad_request("content-type is not valid text"))?;
                MediaType::parse(text)
                    .map(Some)
                    .map_err(|e| DispatchError::bad_request(e.to_string()))
            }
        }
    }

    /// Parsed `Accept` header in preference order.
    pub fn accept(&self) -> Result<Accept, DispatchError> {
        let values = self.header_values(ACCEPT.as_str());
        Accept::parse(values.iter().map(String::as_str))
            .map_err(|e| DispatchError::bad_request(e.to_string()))
    }

    /// All values of query parameter `name`, decoded.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Vec<String> {
        parse_query_params(&self.query)
            .into_iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v)
            .collect()
    }

    /// All values of query parameter `name` exactly as sent.
    #[must_use]
    pub fn query_param_encoded(&self, name: &str) -> Vec<String> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (key == name).then(|| value.to_string())
            })
            .collect()
    }

    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        parse_cookies(&self.headers)
    }

    /// All values of form field `name` from an
    /// `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form_param(&self, name: &str) -> Vec<String> {
        let is_form = matches!(
            self.content_type(),
            Ok(Some(ref m)) if m.type_() == "application" && m.subtype() == "x-www-form-urlencoded"
        );
        if !is_form {
            debug!(name, "Form parameter requested on a non-form body");
            return Vec::new();
        }
        url::form_urlencoded::parse(&self.body)
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .collect()
    }
}

/// Parse the `Cookie` header into name/value pairs.
#[must_use]
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|c| c.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim().to_string();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((name, value))
        })
        .collect()
}

/// Decode a raw query string into ordered pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
