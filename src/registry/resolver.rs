//! Method selection: the verb, consumes and produces filters followed by a
//! pairwise best-match comparison.

use http::Method;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use super::instance::{ResourceInstance, SubResourceInstance};
use crate::error::DispatchError;
use crate::media::{Accept, MediaType};
use crate::metadata::MethodMetadata;
use crate::uri::normalize;

/// Anything that carries method metadata through the filters.
pub trait MethodCandidate {
    fn method_metadata(&self) -> &MethodMetadata;
}

impl MethodCandidate for Arc<MethodMetadata> {
    fn method_metadata(&self) -> &MethodMetadata {
        self
    }
}

impl MethodCandidate for SubResourceInstance {
    fn method_metadata(&self) -> &MethodMetadata {
        self.metadata()
    }
}

/// Selects the method that handles a request on an already matched resource.
///
/// Holds only the request facts selection depends on so it can run against
/// any resource without borrowing the whole request.
#[derive(Debug, Clone, Copy)]
pub struct MethodResolver<'a> {
    verb: &'a Method,
    content_type: Option<&'a MediaType>,
    accept: &'a Accept,
}

impl<'a> MethodResolver<'a> {
    #[must_use]
    pub fn new(verb: &'a Method, content_type: Option<&'a MediaType>, accept: &'a Accept) -> Self {
        Self {
            verb,
            content_type,
            accept,
        }
    }

    /// Best resource method (no path) of an exactly matched resource.
    pub fn find_method(
        &self,
        resource: &ResourceInstance,
    ) -> Result<Arc<MethodMetadata>, DispatchError> {
        let candidates: Vec<Arc<MethodMetadata>> = resource
            .record()
            .metadata()
            .resource_methods()
            .cloned()
            .collect();
        let survivors = self.filter(resource, candidates)?;
        self.select_best(survivors)
    }

    /// Best sub-resource method among `candidates` whose template compiles
    /// to `pattern`.
    pub fn find_sub_resource_method(
        &self,
        pattern: &str,
        candidates: &[SubResourceInstance],
        resource: &ResourceInstance,
    ) -> Result<SubResourceInstance, DispatchError> {
        let siblings: Vec<SubResourceInstance> = candidates
            .iter()
            .filter(|c| !c.is_locator() && c.record().template().pattern() == pattern)
            .cloned()
            .collect();
        let survivors = self.filter(resource, siblings)?;
        self.select_best(survivors)
    }

    /// Verbs declared by the methods that could serve the resource's
    /// current match; used for `Allow`.
    #[must_use]
    pub fn options(resource: &ResourceInstance) -> Vec<Method> {
        if resource.is_exact_match() {
            return resource
                .record()
                .metadata()
                .resource_methods()
                .filter_map(|m| m.http_method().cloned())
                .collect();
        }
        let tail = normalize(resource.matcher().tail());
        resource
            .record()
            .matching_sub_resource_methods(tail)
            .iter()
            .filter_map(|m| m.metadata().http_method().cloned())
            .collect()
    }

    fn filter<T: MethodCandidate>(
        &self,
        resource: &ResourceInstance,
        mut candidates: Vec<T>,
    ) -> Result<Vec<T>, DispatchError> {
        candidates.retain(|c| self.accepts_verb(c.method_metadata()));
        if candidates.is_empty() {
            info!(
                resource = %resource.name(),
                method = %self.verb,
                "No method supports the request verb"
            );
            return Err(DispatchError::method_not_allowed(Self::options(resource)));
        }

        candidates.retain(|c| self.consumes(c.method_metadata()));
        if candidates.is_empty() {
            info!(
                resource = %resource.name(),
                content_type = ?self.content_type.map(ToString::to_string),
                "No method consumes the request content type"
            );
            return Err(DispatchError::UnsupportedMediaType);
        }

        candidates.retain(|c| self.produces(c.method_metadata()));
        if candidates.is_empty() {
            info!(
                resource = %resource.name(),
                accept = ?self.accept.media_types(),
                "No method produces an acceptable media type"
            );
            return Err(DispatchError::NotAcceptable);
        }
        Ok(candidates)
    }

    fn accepts_verb(&self, method: &MethodMetadata) -> bool {
        method.http_method().map_or(true, |verb| verb == self.verb)
    }

    fn consumes(&self, method: &MethodMetadata) -> bool {
        if method.consumed().is_empty() {
            return true;
        }
        let octet_stream = MediaType::application_octet_stream();
        let input = self.content_type.unwrap_or(&octet_stream);
        method.consumed().iter().any(|m| m.is_compatible(input))
    }

    fn produces(&self, method: &MethodMetadata) -> bool {
        if method.produced().is_empty() || self.accept.media_types().is_empty() {
            return true;
        }
        let (denied, acceptable) = self.accept.partition();
        method.produced().iter().any(|produced| {
            !denied.iter().any(|d| d.covers(produced))
                && acceptable.iter().any(|a| produced.is_compatible(a))
        })
    }

    /// Strictly better candidates replace the current best; ties keep the
    /// earlier one.
    fn select_best<T: MethodCandidate>(&self, candidates: Vec<T>) -> Result<T, DispatchError> {
        let mut best: Option<T> = None;
        for candidate in candidates {
            let better = match &best {
                None => true,
                Some(current) => {
                    self.compare(candidate.method_metadata(), current.method_metadata())
                        == Ordering::Greater
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        let best = best.ok_or(DispatchError::NotFound)?;
        debug!(method = %best.method_metadata().name(), "Selected method");
        Ok(best)
    }

    fn compare(&self, a: &MethodMetadata, b: &MethodMetadata) -> Ordering {
        self.compare_consumes(a, b)
            .then_with(|| self.compare_produces(a, b))
            .then_with(|| a.params().len().cmp(&b.params().len()))
    }

    fn compare_consumes(&self, a: &MethodMetadata, b: &MethodMetadata) -> Ordering {
        let Some(input) = self.content_type else {
            return Ordering::Equal;
        };
        let best_a = best_match(input, a.consumed());
        let best_b = best_match(input, b.consumed());
        let (best_a, best_b) = match (best_a, best_b) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => (x, y),
        };
        let by_specificity = best_a.compare_specificity(best_b);
        if by_specificity != Ordering::Equal {
            return by_specificity;
        }

        let all_a = params_match(best_a, input);
        let all_b = params_match(best_b, input);
        match (all_a, all_b) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => best_a.params().len().cmp(&best_b.params().len()),
            (false, false) => Ordering::Equal,
        }
    }

    fn compare_produces(&self, a: &MethodMetadata, b: &MethodMetadata) -> Ordering {
        for accepted in self.accept.media_types() {
            let best_a = best_match(accepted, a.produced());
            let best_b = best_match(accepted, b.produced());
            match (best_a, best_b) {
                (None, None) => continue,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some(x), Some(y)) => return x.compare_specificity(y),
            }
        }
        Ordering::Equal
    }
}

/// Most specific declared type compatible with `target`; the first wins ties.
fn best_match<'m>(target: &MediaType, declared: &'m [MediaType]) -> Option<&'m MediaType> {
    let mut best: Option<&MediaType> = None;
    for candidate in declared.iter().filter(|m| m.is_compatible(target)) {
        if best.map_or(true, |b| candidate.compare_specificity(b) == Ordering::Greater) {
            best = Some(candidate);
        }
    }
    best
}

/// Every parameter of `declared` appears in `input` with an equal value.
fn params_match(declared: &MediaType, input: &MediaType) -> bool {
    declared
        .params()
        .iter()
        .all(|(name, value)| input.param(name) == Some(value.as_str()))
}

