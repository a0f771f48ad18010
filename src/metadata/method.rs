use http::Method;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::class::ClassMetadata;
use super::param::{ParamDescriptor, ParamValue};
use crate::entity::Outcome;
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::providers::ResourceObject;

/// Invokes a resource method on a live resource object.
pub type HandlerFn =
    Arc<dyn Fn(&ResourceObject, &[ParamValue]) -> Result<Outcome, DispatchError> + Send + Sync>;

/// Invokes a sub-resource locator; `Ok(None)` means "no such sub-resource".
pub type LocatorFn = Arc<
    dyn Fn(&ResourceObject, &[ParamValue]) -> Result<Option<SubResource>, DispatchError>
        + Send
        + Sync,
>;

/// Object returned by a locator together with the metadata describing it.
#[derive(Clone)]
pub struct SubResource {
    instance: ResourceObject,
    metadata: Arc<ClassMetadata>,
}

impl SubResource {
    pub fn new<T: Any + Send + Sync>(instance: T, metadata: Arc<ClassMetadata>) -> Self {
        Self::from_object(Arc::new(instance), metadata)
    }

    #[must_use]
    pub fn from_object(instance: ResourceObject, metadata: Arc<ClassMetadata>) -> Self {
        Self { instance, metadata }
    }

    #[must_use]
    pub fn instance(&self) -> &ResourceObject {
        &self.instance
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }
}

impl fmt::Debug for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubResource")
            .field("class", &self.metadata.name())
            .finish()
    }
}

#[derive(Clone)]
pub enum MethodTarget {
    Handler(HandlerFn),
    Locator(LocatorFn),
}

/// A resource method, sub-resource method or sub-resource locator.
///
/// | verb | path | role |
/// |------|------|------|
/// | some | none | resource method |
/// | some | some | sub-resource method |
/// | none | some | sub-resource locator |
#[derive(Clone)]
pub struct MethodMetadata {
    name: String,
    http_method: Option<Method>,
    path: Option<String>,
    consumes: Vec<MediaType>,
    produces: Vec<MediaType>,
    params: Vec<ParamDescriptor>,
    target: MethodTarget,
}

fn downcast<'a, T: Any>(object: &'a ResourceObject, method: &str) -> Result<&'a T, DispatchError> {
    object.downcast_ref::<T>().ok_or_else(|| {
        DispatchError::internal(format!(
            "{} invoked on an object that is not a {}",
            method,
            std::any::type_name::<T>()
        ))
    })
}

impl MethodMetadata {
    /// Resource method bound to `verb`, invoked on a `T`.
    pub fn handler<T, F>(name: impl Into<String>, verb: Method, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &[ParamValue]) -> Result<Outcome, DispatchError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            http_method: Some(verb),
            path: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            params: Vec::new(),
            target: MethodTarget::Handler(Arc::new(
                move |object: &ResourceObject, params: &[ParamValue]| {
                    f(downcast::<T>(object, &label)?, params)
                },
            )),
        }
    }

    /// Sub-resource locator at `path`, invoked on a `T`.
    pub fn locator<T, F>(name: impl Into<String>, path: impl Into<String>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &[ParamValue]) -> Result<Option<SubResource>, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            http_method: None,
            path: Some(path.into()),
            consumes: Vec::new(),
            produces: Vec::new(),
            params: Vec::new(),
            target: MethodTarget::Locator(Arc::new(
                move |object: &ResourceObject, params: &[ParamValue]| {
                    f(downcast::<T>(object, &label)?, params)
                },
            )),
        }
    }

    /// Turn a resource method into a sub-resource method at `path`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn consumes(mut self, media_type: MediaType) -> Self {
        self.consumes.push(media_type);
        self
    }

    #[must_use]
    pub fn produces(mut self, media_type: MediaType) -> Self {
        self.produces.push(media_type);
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn http_method(&self) -> Option<&Method> {
        self.http_method.as_ref()
    }

    #[must_use]
    pub fn path_template(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn consumed(&self) -> &[MediaType] {
        &self.consumes
    }

    #[must_use]
    pub fn produced(&self) -> &[MediaType] {
        &self.produces
    }

    #[must_use]
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    #[must_use]
    pub fn target(&self) -> &MethodTarget {
        &self.target
    }

    #[must_use]
    pub fn is_locator(&self) -> bool {
        matches!(self.target, MethodTarget::Locator(_))
    }

    /// Copy class-level media types onto a method that declares none.
    pub(crate) fn inherit_media_types(&mut self, consumes: &[MediaType], produces: &[MediaType]) {
        if self.consumes.is_empty() {
            self.consumes = consumes.to_vec();
        }
        if self.produces.is_empty() {
            self.produces = produces.to_vec();
        }
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("name", &self.name)
            .field("http_method", &self.http_method)
            .field("path", &self.path)
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("params", &self.params.len())
            .field("locator", &self.is_locator())
            .finish()
    }
}
