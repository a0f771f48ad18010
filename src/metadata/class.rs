use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::method::MethodMetadata;
use crate::entity::TypeInfo;
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::providers::{ObjectFactory, ResourceObject};
use crate::server::Request;

/// Everything the dispatcher needs to know about one resource class.
#[derive(Clone)]
pub struct ClassMetadata {
    key: TypeInfo,
    name: String,
    path: Option<String>,
    dynamic: bool,
    consumes: Vec<MediaType>,
    produces: Vec<MediaType>,
    methods: Vec<Arc<MethodMetadata>>,
    factory: Arc<dyn ObjectFactory>,
}

impl ClassMetadata {
    /// Metadata for resource type `T`, whose objects come from `factory`.
    /// The display name defaults to the unqualified type name.
    pub fn new<T: Any>(factory: impl ObjectFactory + 'static) -> Self {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self {
            key: TypeInfo::of::<T>(),
            name: short.to_string(),
            path: None,
            dynamic: false,
            consumes: Vec::new(),
            produces: Vec::new(),
            methods: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    /// Metadata for a class whose objects only ever come from locators.
    /// The locator supplies each object; there is no factory of its own.
    pub fn sub_resource<T: Any>() -> Self {
        Self::new::<T>(LocatorSupplied)
    }

    /// Root path template.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Mark as dynamic: every registration gets its own record.
    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Class-level `consumes`, inherited by methods that declare none.
    #[must_use]
    pub fn consumes(mut self, media_type: MediaType) -> Self {
        self.consumes.push(media_type);
        self
    }

    /// Class-level `produces`, inherited by methods that declare none.
    #[must_use]
    pub fn produces(mut self, media_type: MediaType) -> Self {
        self.produces.push(media_type);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    #[must_use]
    pub fn key(&self) -> TypeInfo {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn root_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    #[must_use]
    pub fn methods(&self) -> &[Arc<MethodMetadata>] {
        &self.methods
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.factory
    }

    /// Methods without a path: candidates on an exact match.
    pub fn resource_methods(&self) -> impl Iterator<Item = &Arc<MethodMetadata>> {
        self.methods
            .iter()
            .filter(|m| !m.is_locator() && m.path_template().is_none())
    }

    pub fn sub_resource_methods(&self) -> impl Iterator<Item = &Arc<MethodMetadata>> {
        self.methods
            .iter()
            .filter(|m| !m.is_locator() && m.path_template().is_some())
    }

    pub fn locators(&self) -> impl Iterator<Item = &Arc<MethodMetadata>> {
        self.methods.iter().filter(|m| m.is_locator())
    }

    /// Copy with class-level media types pushed down onto every method
    /// that declares none of its own.
    #[must_use]
    pub(crate) fn with_inherited_media_types(&self) -> Self {
        if self.consumes.is_empty() && self.produces.is_empty() {
            return self.clone();
        }
        let mut resolved = self.clone();
        resolved.methods = self
            .methods
            .iter()
            .map(|method| {
                let mut method = MethodMetadata::clone(method);
                method.inherit_media_types(&self.consumes, &self.produces);
                Arc::new(method)
            })
            .collect();
        resolved
    }
}

struct LocatorSupplied;

impl ObjectFactory for LocatorSupplied {
    fn instance(&self, _request: &Request) -> Result<ResourceObject, DispatchError> {
        Err(DispatchError::internal(
            "sub-resource class has no factory; register it with a root path and a factory",
        ))
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("dynamic", &self.dynamic)
            .field("methods", &self.methods)
            .finish()
    }
}
