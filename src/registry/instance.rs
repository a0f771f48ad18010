use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::record::{ResourceRecord, SubResourceRecord};
use crate::error::DispatchError;
use crate::metadata::MethodMetadata;
use crate::providers::ResourceObject;
use crate::server::Request;
use crate::uri::UriTemplateMatcher;

enum InstanceSlot {
    Empty,
    Live(ResourceObject),
    Released,
}

/// A record paired with the match that selected it, plus the lazily
/// created resource object.
pub struct ResourceInstance {
    record: Arc<ResourceRecord>,
    matcher: UriTemplateMatcher,
    slot: Mutex<InstanceSlot>,
}

impl ResourceInstance {
    #[must_use]
    pub fn new(record: Arc<ResourceRecord>, matcher: UriTemplateMatcher) -> Self {
        Self {
            record,
            matcher,
            slot: Mutex::new(InstanceSlot::Empty),
        }
    }

    #[must_use]
    pub fn record(&self) -> &Arc<ResourceRecord> {
        &self.record
    }

    #[must_use]
    pub fn matcher(&self) -> &UriTemplateMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.record.name()
    }

    #[must_use]
    pub fn is_exact_match(&self) -> bool {
        self.matcher.is_exact_match()
    }

    /// The resource object, created on first use.
    pub fn instance(&self, request: &Request) -> Result<ResourceObject, DispatchError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            InstanceSlot::Live(object) => Ok(Arc::clone(object)),
            InstanceSlot::Released => Err(DispatchError::internal(format!(
                "resource {} used after release",
                self.record.name()
            ))),
            InstanceSlot::Empty => {
                let object = self.record.factory().instance(request)?;
                *slot = InstanceSlot::Live(Arc::clone(&object));
                Ok(object)
            }
        }
    }

    /// True once an object has been created and not yet released.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner),
            InstanceSlot::Live(_)
        )
    }

    /// Hand the object back to its factory. Safe to call repeatedly and on
    /// instances that never created an object.
    pub fn release(&self, request: &Request) {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, InstanceSlot::Released)
        };
        if let InstanceSlot::Live(object) = previous {
            debug!(resource = %self.record.name(), "Releasing resource instance");
            self.record.factory().release(&object, request);
        }
    }
}

impl fmt::Debug for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInstance")
            .field("resource", &self.record.name())
            .field("head", &self.matcher.head())
            .field("tail", &self.matcher.tail())
            .finish()
    }
}

/// A sub-resource method or locator paired with the match of its template
/// against the parent's tail.
#[derive(Clone)]
pub struct SubResourceInstance {
    record: Arc<SubResourceRecord>,
    matcher: UriTemplateMatcher,
}

impl SubResourceInstance {
    #[must_use]
    pub fn new(record: Arc<SubResourceRecord>, matcher: UriTemplateMatcher) -> Self {
        Self { record, matcher }
    }

    #[must_use]
    pub fn record(&self) -> &Arc<SubResourceRecord> {
        &self.record
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<MethodMetadata> {
        self.record.metadata()
    }

    #[must_use]
    pub fn matcher(&self) -> &UriTemplateMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn is_locator(&self) -> bool {
        self.record.is_locator()
    }
}

impl fmt::Debug for SubResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubResourceInstance")
            .field("method", &self.record.metadata().name())
            .field("template", &self.record.template().as_str())
            .finish()
    }
}
