use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::server::Request;

/// A live resource object as handed to handlers and locators.
pub type ResourceObject = Arc<dyn Any + Send + Sync>;

/// Produces and recycles resource objects.
///
/// `release` may be called for objects whose construction was abandoned and
/// must tolerate that.
pub trait ObjectFactory: Send + Sync {
    fn instance(&self, request: &Request) -> Result<ResourceObject, DispatchError>;

    fn release(&self, _instance: &ResourceObject, _request: &Request) {}
}

/// One shared object for every request.
pub struct SingletonFactory {
    instance: ResourceObject,
}

impl SingletonFactory {
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self {
            instance: Arc::new(instance),
        }
    }
}

impl ObjectFactory for SingletonFactory {
    fn instance(&self, _request: &Request) -> Result<ResourceObject, DispatchError> {
        Ok(Arc::clone(&self.instance))
    }
}

type Constructor = dyn Fn(&Request) -> Result<ResourceObject, DispatchError> + Send + Sync;
type ReleaseHook = dyn Fn(&ResourceObject, &Request) + Send + Sync;

/// A fresh object per request, with an optional release hook.
pub struct PerRequestFactory {
    constructor: Box<Constructor>,
    on_release: Option<Box<ReleaseHook>>,
}

impl PerRequestFactory {
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Request) -> T + Send + Sync + 'static,
    {
        Self {
            constructor: Box::new(move |req: &Request| {
                Ok(Arc::new(constructor(req)) as ResourceObject)
            }),
            on_release: None,
        }
    }

    /// Constructor that may fail.
    pub fn fallible<F>(constructor: F) -> Self
    where
        F: Fn(&Request) -> Result<ResourceObject, DispatchError> + Send + Sync + 'static,
    {
        Self {
            constructor: Box::new(constructor),
            on_release: None,
        }
    }

    #[must_use]
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ResourceObject, &Request) + Send + Sync + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }
}

impl ObjectFactory for PerRequestFactory {
    fn instance(&self, request: &Request) -> Result<ResourceObject, DispatchError> {
        (self.constructor)(request)
    }

    fn release(&self, instance: &ResourceObject, request: &Request) {
        if let Some(hook) = &self.on_release {
            hook(instance, request);
        }
    }
}

/// Wraps an already constructed object, such as one returned by a locator.
pub struct InstanceFactory {
    instance: ResourceObject,
}

impl InstanceFactory {
    #[must_use]
    pub fn new(instance: ResourceObject) -> Self {
        Self { instance }
    }
}

impl ObjectFactory for InstanceFactory {
    fn instance(&self, _request: &Request) -> Result<ResourceObject, DispatchError> {
        Ok(Arc::clone(&self.instance))
    }
}

impl fmt::Debug for dyn ObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectFactory")
    }
}
