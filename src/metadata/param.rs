use http::HeaderMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::UriInfo;
use crate::entity::{Entity, TypeInfo};
use crate::providers::{ConvertedValue, ParamConverter};

/// Request-scoped context objects injectable into a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Snapshot of matched URIs, resources and path parameters.
    UriInfo,
    /// All request headers.
    Headers,
}

/// Where a formal parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Template variable bound while matching.
    Path { name: String },
    /// Query string parameter.
    Query { name: String },
    /// Matrix parameter of the last matched segment.
    Matrix { name: String },
    Header { name: String },
    Cookie { name: String },
    /// `application/x-www-form-urlencoded` body field.
    Form { name: String },
    /// Request body read through a [`MessageBodyReader`](crate::providers::MessageBodyReader).
    Entity { target: TypeInfo },
    Context(ContextKind),
}

impl ParamKind {
    /// Parameter name for name-keyed kinds.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            ParamKind::Path { name }
            | ParamKind::Query { name }
            | ParamKind::Matrix { name }
            | ParamKind::Header { name }
            | ParamKind::Cookie { name }
            | ParamKind::Form { name } => Some(name),
            ParamKind::Entity { .. } | ParamKind::Context(_) => None,
        }
    }
}

/// One formal parameter of a resource method or locator.
#[derive(Clone)]
pub struct ParamDescriptor {
    kind: ParamKind,
    default: Option<String>,
    encoded: bool,
    converter: Option<Arc<dyn ParamConverter>>,
}

impl ParamDescriptor {
    #[must_use]
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            default: None,
            encoded: false,
            converter: None,
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Path { name: name.into() })
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Query { name: name.into() })
    }

    pub fn matrix(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Matrix { name: name.into() })
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Header { name: name.into() })
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Cookie { name: name.into() })
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::new(ParamKind::Form { name: name.into() })
    }

    /// Request body deserialised as `T`.
    #[must_use]
    pub fn entity<T: Any>() -> Self {
        Self::new(ParamKind::Entity {
            target: TypeInfo::of::<T>(),
        })
    }

    #[must_use]
    pub fn context(kind: ContextKind) -> Self {
        Self::new(ParamKind::Context(kind))
    }

    /// Value used when the request carries none.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Keep percent-encoding in path, query and matrix values.
    #[must_use]
    pub fn encoded(mut self) -> Self {
        self.encoded = true;
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: impl ParamConverter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn is_encoded(&self) -> bool {
        self.encoded
    }

    #[must_use]
    pub fn converter(&self) -> Option<&Arc<dyn ParamConverter>> {
        self.converter.as_ref()
    }
}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("encoded", &self.encoded)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

/// A bound parameter value, positionally matching the method's descriptors.
#[derive(Clone)]
pub enum ParamValue {
    /// Raw string values (no converter configured).
    Values(Vec<String>),
    /// Output of the descriptor's converter.
    Converted(ConvertedValue),
    /// Request body; `None` when the request had no body.
    Entity(Option<Entity>),
    UriInfo(UriInfo),
    Headers(HeaderMap),
}

impl ParamValue {
    /// First raw value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Values(values) => values.first().map(String::as_str),
            _ => None,
        }
    }

    /// All raw values; empty for non-string parameters.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            ParamValue::Values(values) => values,
            _ => &[],
        }
    }

    #[must_use]
    pub fn converted<T: Any>(&self) -> Option<&T> {
        match self {
            ParamValue::Converted(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            ParamValue::Entity(entity) => entity.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn uri_info(&self) -> Option<&UriInfo> {
        match self {
            ParamValue::UriInfo(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            ParamValue::Headers(headers) => Some(headers),
            _ => None,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Values(values) => f.debug_tuple("Values").field(values).finish(),
            ParamValue::Converted(_) => f.write_str("Converted(..)"),
            ParamValue::Entity(entity) => f.debug_tuple("Entity").field(entity).finish(),
            ParamValue::UriInfo(info) => f.debug_tuple("UriInfo").field(info).finish(),
            ParamValue::Headers(headers) => f.debug_tuple("Headers").field(headers).finish(),
        }
    }
}
