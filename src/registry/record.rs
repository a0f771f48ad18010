use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::instance::SubResourceInstance;
use crate::metadata::{ClassMetadata, MethodMetadata};
use crate::providers::ObjectFactory;
use crate::uri::{TemplateError, UriTemplate};

/// A method or locator reachable through a path relative to its resource.
pub struct SubResourceRecord {
    metadata: Arc<MethodMetadata>,
    template: Arc<UriTemplate>,
}

impl SubResourceRecord {
    /// Compile the method's path template. The method must declare a path.
    pub fn new(metadata: Arc<MethodMetadata>) -> Result<Self, TemplateError> {
        let template = UriTemplate::compile(metadata.path_template().unwrap_or(""))?;
        Ok(Self {
            metadata,
            template: Arc::new(template),
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<MethodMetadata> {
        &self.metadata
    }

    #[must_use]
    pub fn template(&self) -> &Arc<UriTemplate> {
        &self.template
    }

    #[must_use]
    pub fn is_locator(&self) -> bool {
        self.metadata.is_locator()
    }

    /// Sort key: template specificity, then methods ahead of locators.
    /// `Greater` means `self` is tried first.
    #[must_use]
    pub fn compare(&self, other: &SubResourceRecord) -> Ordering {
        self.template
            .compare_specificity(&other.template)
            .then_with(|| other.is_locator().cmp(&self.is_locator()))
    }
}

impl fmt::Debug for SubResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubResourceRecord")
            .field("method", &self.metadata.name())
            .field("template", &self.template.as_str())
            .field("locator", &self.is_locator())
            .finish()
    }
}

/// One resource class ready for matching.
///
/// Cloning is cheap: the metadata, template and sub-resource list are
/// shared. Clones are used to vary the priority or object factory of a
/// cached record.
#[derive(Clone)]
pub struct ResourceRecord {
    metadata: Arc<ClassMetadata>,
    template: Option<Arc<UriTemplate>>,
    priority: f64,
    factory: Arc<dyn ObjectFactory>,
    sub_resources: Arc<[Arc<SubResourceRecord>]>,
}

impl ResourceRecord {
    /// Build a record from class metadata; sub-resources are ordered most
    /// specific first.
    pub fn build(metadata: Arc<ClassMetadata>, priority: f64) -> Result<Self, TemplateError> {
        let template = metadata
            .root_path()
            .map(UriTemplate::compile)
            .transpose()?
            .map(Arc::new);

        let mut sub_resources = metadata
            .methods()
            .iter()
            .filter(|m| m.path_template().is_some())
            .map(|m| SubResourceRecord::new(Arc::clone(m)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        // Stable: declaration order survives full ties.
        sub_resources.sort_by(|a, b| b.compare(a));

        Ok(Self {
            factory: Arc::clone(metadata.factory()),
            metadata,
            template,
            priority,
            sub_resources: sub_resources.into(),
        })
    }

    #[must_use]
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    #[must_use]
    pub fn template(&self) -> Option<&Arc<UriTemplate>> {
        self.template.as_ref()
    }

    #[must_use]
    pub fn priority(&self) -> f64 {
        self.priority
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<dyn ObjectFactory> {
        &self.factory
    }

    #[must_use]
    pub fn sub_resources(&self) -> &[Arc<SubResourceRecord>] {
        &self.sub_resources
    }

    #[must_use]
    pub fn has_sub_resources(&self) -> bool {
        !self.sub_resources.is_empty()
    }

    /// Sub-resources matching `uri` (a normalised tail), most specific
    /// first. Methods must match exactly; locators may leave a tail.
    #[must_use]
    pub fn matching_sub_resources(&self, uri: &str) -> Vec<SubResourceInstance> {
        self.sub_resources
            .iter()
            .filter_map(|record| {
                let matcher = record.template().match_uri(uri)?;
                (record.is_locator() || matcher.is_exact_match())
                    .then(|| SubResourceInstance::new(Arc::clone(record), matcher))
            })
            .collect()
    }

    /// Sub-resource methods (not locators) matching `uri` exactly.
    #[must_use]
    pub fn matching_sub_resource_methods(&self, uri: &str) -> Vec<SubResourceInstance> {
        self.sub_resources
            .iter()
            .filter(|record| !record.is_locator())
            .filter_map(|record| {
                let matcher = record.template().match_uri(uri)?;
                matcher
                    .is_exact_match()
                    .then(|| SubResourceInstance::new(Arc::clone(record), matcher))
            })
            .collect()
    }

    /// Root ordering: priority, then template specificity. `Greater` means
    /// `self` is tried first.
    #[must_use]
    pub fn compare(&self, other: &ResourceRecord) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (&self.template, &other.template) {
                (Some(a), Some(b)) => a.compare_specificity(b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Debug for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRecord")
            .field("class", &self.metadata.name())
            .field("template", &self.template.as_ref().map(|t| t.as_str()))
            .field("priority", &self.priority)
            .field("sub_resources", &self.sub_resources)
            .finish()
    }
}
