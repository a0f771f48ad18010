use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::factory::RecordFactory;
use super::instance::ResourceInstance;
use super::record::ResourceRecord;
use crate::config::DispatchConfig;
use crate::metadata::ClassMetadata;
use crate::providers::{DefaultResourceValidator, ResourceValidator};
use crate::uri::{normalize, TemplateError};

type CacheKey = (bool, String);

/// All root resources, ordered for matching.
///
/// Registration is expected at startup; every add re-sorts the roots and
/// clears the path cache. Matching only ever takes read locks on the roots.
/// The path cache remembers which records matched a stripped path under
/// each search policy; a hit is re-validated with fresh matchers, so a
/// cached entry can never yield a wrong candidate.
pub struct ResourceRegistry {
    roots: RwLock<Vec<Arc<ResourceRecord>>>,
    factory: RecordFactory,
    validator: Box<dyn ResourceValidator>,
    cache: Option<RwLock<LruCache<CacheKey, Vec<Arc<ResourceRecord>>>>>,
    default_priority: f64,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        let cache = NonZeroUsize::new(config.root_cache_capacity)
            .map(|capacity| RwLock::new(LruCache::new(capacity)));
        Self {
            roots: RwLock::new(Vec::new()),
            factory: RecordFactory::new(),
            validator: Box::new(DefaultResourceValidator),
            cache,
            default_priority: config.default_priority,
        }
    }

    /// Replace the predicate deciding which classes may be registered.
    #[must_use]
    pub fn with_validator(mut self, validator: impl ResourceValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Register with the default priority. See [`add_resource_with_priority`](Self::add_resource_with_priority).
    pub fn add_resource(&self, metadata: ClassMetadata) -> Result<bool, TemplateError> {
        self.add_resource_with_priority(metadata, self.default_priority)
    }

    /// Register a root resource. Returns `Ok(false)` (and logs) when the
    /// validator rejects the class; template compilation errors are returned.
    pub fn add_resource_with_priority(
        &self,
        metadata: ClassMetadata,
        priority: f64,
    ) -> Result<bool, TemplateError> {
        debug!(resource = %metadata.name(), priority, "Adding resource");
        if !self.validator.is_valid(&metadata) {
            warn!(resource = %metadata.name(), "Resource class is not valid; skipped");
            return Ok(false);
        }
        let record = self.factory.root_record(metadata, priority)?;

        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        roots.push(Arc::clone(&record));
        // Stable: registration order survives full ties.
        roots.sort_by(|a, b| b.compare(a));
        if let Some(cache) = &self.cache {
            cache.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
        info!(
            resource = %record.name(),
            template = record.template().map(|t| t.as_str()).unwrap_or(""),
            priority,
            roots = roots.len(),
            "Resource registered"
        );
        Ok(true)
    }

    /// Registered roots in matching order.
    #[must_use]
    pub fn records(&self) -> Vec<Arc<ResourceRecord>> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn record_factory(&self) -> &RecordFactory {
        &self.factory
    }

    /// Root resources whose template matches `path` (matrix parameters
    /// already stripped), in matching order.
    ///
    /// A partial match only counts when the resource has sub-resources to
    /// consume the tail. Strict mode stops at the first candidate.
    #[must_use]
    pub fn matching_root_resources(
        &self,
        path: &str,
        continued_search: bool,
    ) -> Vec<ResourceInstance> {
        let uri = normalize(path);
        let key: CacheKey = (continued_search, uri.to_string());

        if let Some(cache) = &self.cache {
            let guard = cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(records) = guard.peek(&key) {
                let found: Vec<ResourceInstance> = records
                    .iter()
                    .filter_map(|record| {
                        let matcher = record.template()?.match_uri(uri)?;
                        Some(ResourceInstance::new(Arc::clone(record), matcher))
                    })
                    .collect();
                debug!(path = %uri, candidates = found.len(), "Root cache hit");
                return found;
            }
        }

        let mut matched_records = Vec::new();
        let mut found = Vec::new();
        {
            let roots = self.roots.read().unwrap_or_else(PoisonError::into_inner);
            for record in roots.iter() {
                let Some(matcher) = record.template().and_then(|t| t.match_uri(uri)) else {
                    continue;
                };
                if !(matcher.is_exact_match() || record.has_sub_resources()) {
                    continue;
                }
                matched_records.push(Arc::clone(record));
                found.push(ResourceInstance::new(Arc::clone(record), matcher));
                if !continued_search {
                    break;
                }
            }
        }
        debug!(path = %uri, candidates = found.len(), continued_search, "Root scan");

        if let Some(cache) = &self.cache {
            cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .put(key, matched_records);
        }
        found
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("roots", &self.records())
            .field("cache_enabled", &self.cache.is_some())
            .field("default_priority", &self.default_priority)
            .finish()
    }
}
