use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use super::record::ResourceRecord;
use crate::entity::TypeInfo;
use crate::metadata::{ClassMetadata, SubResource};
use crate::providers::InstanceFactory;
use crate::uri::TemplateError;

/// Builds [`ResourceRecord`]s, caching them per resource type.
///
/// Compiling templates and sorting sub-resources happens once per static
/// type; dynamic classes get a fresh record on every call. Cache reads take
/// the read lock; a miss builds outside any lock and then inserts under the
/// write lock, keeping whichever record landed first.
#[derive(Default)]
pub struct RecordFactory {
    cache: RwLock<HashMap<TypeInfo, Arc<ResourceRecord>>>,
}

impl RecordFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a root resource class.
    pub fn root_record(
        &self,
        metadata: ClassMetadata,
        priority: f64,
    ) -> Result<Arc<ResourceRecord>, TemplateError> {
        if metadata.is_dynamic() {
            let record = build(metadata, priority)?;
            debug!(resource = %record.name(), "Built dynamic resource record");
            return Ok(Arc::new(record));
        }
        let shared = self.cached(metadata, priority)?;
        if shared.priority() == priority {
            return Ok(shared);
        }
        Ok(Arc::new(ResourceRecord::clone(&shared).with_priority(priority)))
    }

    /// Record for an object returned by a sub-resource locator. The record
    /// always hands out exactly that object.
    pub fn sub_resource_record(
        &self,
        sub_resource: &SubResource,
    ) -> Result<Arc<ResourceRecord>, TemplateError> {
        let metadata = ClassMetadata::clone(sub_resource.metadata());
        let shape = if metadata.is_dynamic() {
            Arc::new(build(metadata, 0.0)?)
        } else {
            self.cached(metadata, 0.0)?
        };
        let factory = Arc::new(InstanceFactory::new(Arc::clone(sub_resource.instance())));
        Ok(Arc::new(ResourceRecord::clone(&shape).with_factory(factory)))
    }

    /// Number of cached static records.
    #[must_use]
    pub fn cached_records(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(
        &self,
        metadata: ClassMetadata,
        priority: f64,
    ) -> Result<Arc<ResourceRecord>, TemplateError> {
        let key = metadata.key();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = cache.get(&key) {
                debug!(resource = %record.name(), "Resource record cache hit");
                return Ok(Arc::clone(record));
            }
        }

        let record = Arc::new(build(metadata, priority)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key).or_insert_with(|| {
            info!(
                resource = %record.name(),
                sub_resources = record.sub_resources().len(),
                "Resource record created"
            );
            Arc::clone(&record)
        });
        Ok(Arc::clone(entry))
    }
}

fn build(metadata: ClassMetadata, priority: f64) -> Result<ResourceRecord, TemplateError> {
    ResourceRecord::build(Arc::new(metadata.with_inherited_media_types()), priority)
}
