//! Response entities and the envelope handlers return.
//!
//! Handlers hand back an [`Outcome`]: nothing, a bare [`Entity`], or a
//! [`ResponseEnvelope`] that additionally pins the status code and headers.
//! Entities are type-erased so that writer lookup can key on the concrete
//! Rust type ([`TypeInfo`]) the same way providers are registered.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Runtime identity of an entity type, used as the provider lookup key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Type identity of `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True when this describes `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased response (or request) body value.
///
/// `generic_type` mirrors a generic-entity override: when set, writers are
/// looked up with it as the declared type while `raw_type` still names the
/// concrete value.
#[derive(Clone)]
pub struct Entity {
    value: Arc<dyn Any + Send + Sync>,
    raw_type: TypeInfo,
    generic_type: Option<TypeInfo>,
}

impl Entity {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            raw_type: TypeInfo::of::<T>(),
            generic_type: None,
        }
    }

    /// Wrap `value` with an explicit declared type for writer lookup.
    pub fn with_generic_type<T: Any + Send + Sync>(value: T, generic_type: TypeInfo) -> Self {
        Self {
            value: Arc::new(value),
            raw_type: TypeInfo::of::<T>(),
            generic_type: Some(generic_type),
        }
    }

    #[must_use]
    pub fn raw_type(&self) -> TypeInfo {
        self.raw_type
    }

    /// Declared type: the explicit override if any, otherwise the raw type.
    #[must_use]
    pub fn generic_type(&self) -> TypeInfo {
        self.generic_type.unwrap_or(self.raw_type)
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("raw_type", &self.raw_type)
            .field("generic_type", &self.generic_type)
            .finish()
    }
}

/// Explicit response: optional status, headers and entity.
#[derive(Debug, Clone, Default)]
pub struct ResponseEnvelope {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub entity: Option<Entity>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ok(entity: Entity) -> Self {
        Self {
            status: Some(StatusCode::OK),
            headers: HeaderMap::new(),
            entity: Some(entity),
        }
    }

    /// Add a header, replacing any previous value with the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// What an invoked resource method produced.
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    /// No entity; status defaults to 204.
    #[default]
    Empty,
    Entity(Entity),
    Response(ResponseEnvelope),
}

impl Outcome {
    /// Shorthand for `Outcome::Entity(Entity::new(value))`.
    pub fn entity<T: Any + Send + Sync>(value: T) -> Self {
        Outcome::Entity(Entity::new(value))
    }

    /// The entity carried by this outcome, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Entity> {
        match self {
            Outcome::Empty => None,
            Outcome::Entity(entity) => Some(entity),
            Outcome::Response(envelope) => envelope.entity.as_ref(),
        }
    }

    #[must_use]
    pub fn explicit_status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Response(envelope) => envelope.status,
            _ => None,
        }
    }

    #[must_use]
    pub fn explicit_headers(&self) -> Option<&HeaderMap> {
        match self {
            Outcome::Response(envelope) => Some(&envelope.headers),
            _ => None,
        }
    }
}
