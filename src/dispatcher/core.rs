use std::sync::Arc;
use tracing::{debug, info};

use super::context::MessageContext;
use super::search::{AccumulatedData, FoundMethod, SearchResult};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::metadata::{MethodTarget, SubResource};
use crate::pipeline::bind_parameters;
use crate::registry::{MethodResolver, ResourceInstance, SubResourceInstance};
use crate::uri::{normalize, strip_matrix_params, UriTemplateMatcher};

/// One level of sub-resource search: the candidates of a partially
/// matched resource and the state to restore before trying each.
struct Frame {
    resource: Arc<ResourceInstance>,
    saved: AccumulatedData,
    /// Candidates actually tried; only the first in strict mode.
    candidates: Vec<SubResourceInstance>,
    /// Every matching sub-resource, for sibling lookup.
    all: Vec<SubResourceInstance>,
    next: usize,
}

enum Step {
    /// The search at this level ended; `found` or `error` is set.
    Done,
    Descend(Frame),
}

/// Root and method search.
///
/// Locator hops are walked with an explicit frame stack rather than
/// recursion. Each frame restores its saved [`AccumulatedData`] before a
/// candidate is tried and releases whatever the previous attempt created,
/// so a failed branch never leaks into the next one. The search policy is
/// the same at the root and at every depth.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPipeline {
    continued_search: bool,
}

impl DispatchPipeline {
    #[must_use]
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            continued_search: config.search_policy_continued_search,
        }
    }

    /// Populate `ctx.search` for the current request.
    ///
    /// A failed search is not an `Err`: it leaves `found == false` with the
    /// error of the last attempt. `Err` is reserved for failures that abort
    /// dispatch outright, such as a locator raising an error or an
    /// unparsable `Content-Type`.
    pub fn find_resource(&self, ctx: &mut MessageContext<'_>) -> Result<(), DispatchError> {
        let verb = ctx.request.method().clone();
        let content_type = ctx.request.content_type()?;
        let accept = ctx.request.accept()?;
        let resolver = MethodResolver::new(&verb, content_type.as_ref(), &accept);

        let stripped = strip_matrix_params(ctx.request.segments());
        let roots = ctx
            .registry
            .matching_root_resources(&stripped, self.continued_search);
        if roots.is_empty() {
            info!(path = %ctx.request.path(), "No root resource matches");
            ctx.search = SearchResult::new();
            ctx.search.set_error(DispatchError::NotFound);
            return Ok(());
        }

        for root in roots {
            let root = Arc::new(root);
            debug!(resource = %root.name(), exact = root.is_exact_match(), "Trying root resource");
            ctx.search = SearchResult::new();
            {
                let data = &mut ctx.search.data;
                let segments = ctx.request.segments();
                data.store_variables(root.matcher());
                let count = data.add_matched_uri(&root.matcher().head(), segments);
                data.store_variable_segments(root.matcher(), segments, 0, count);
                data.push_resource(Arc::clone(&root));
            }

            self.find_method(ctx, &resolver)?;
            if ctx.search.is_found() {
                return Ok(());
            }
            ctx.search.data.release_all(&ctx.request);
            debug!(
                resource = %root.name(),
                error = ?ctx.search.error().map(DispatchError::status),
                "Root resource failed"
            );
        }
        Ok(())
    }

    fn find_method(
        &self,
        ctx: &mut MessageContext<'_>,
        resolver: &MethodResolver<'_>,
    ) -> Result<(), DispatchError> {
        let mut stack = match self.enter(ctx, resolver) {
            Step::Done => return Ok(()),
            Step::Descend(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            let Some(candidate) = frame.candidates.get(frame.next).cloned() else {
                stack.pop();
                continue;
            };
            frame.next += 1;

            ctx.search.data.release_beyond(&frame.saved, &ctx.request);
            ctx.search.data = frame.saved.clone();
            ctx.search.found = false;

            if !candidate.is_locator() {
                let pattern = candidate.record().template().pattern();
                match resolver.find_sub_resource_method(pattern, &frame.all, &frame.resource) {
                    Ok(method) => {
                        save_found_method(ctx, method.matcher());
                        debug!(method = %method.metadata().name(), "Sub-resource method found");
                        ctx.search.set_found(FoundMethod::SubResourceMethod(method));
                        return Ok(());
                    }
                    Err(err) => {
                        debug!(
                            template = %candidate.record().template().as_str(),
                            status = %err.status(),
                            "Sub-resource method candidate failed"
                        );
                        ctx.search.set_error(err);
                    }
                }
                continue;
            }

            let resource = Arc::clone(&frame.resource);
            save_found_method(ctx, candidate.matcher());
            ctx.search.method = Some(FoundMethod::Locator(candidate.clone()));

            let Some(sub) = invoke_locator(ctx, &resource, &candidate)? else {
                debug!(locator = %candidate.metadata().name(), "Locator returned no sub-resource");
                ctx.search.set_error(DispatchError::NotFound);
                continue;
            };
            let record = ctx
                .registry
                .record_factory()
                .sub_resource_record(&sub)
                .map_err(|e| DispatchError::internal(e.to_string()))?;
            let instance = ResourceInstance::new(record, candidate.matcher().clone());
            debug!(
                locator = %candidate.metadata().name(),
                resource = %instance.name(),
                tail = %instance.matcher().tail(),
                "Descending into sub-resource"
            );
            ctx.search.data.push_resource(Arc::new(instance));

            match self.enter(ctx, resolver) {
                Step::Done if ctx.search.is_found() => return Ok(()),
                Step::Done => {}
                Step::Descend(next) => stack.push(next),
            }
        }
        Ok(())
    }

    /// Start searching the newest matched resource.
    fn enter(&self, ctx: &mut MessageContext<'_>, resolver: &MethodResolver<'_>) -> Step {
        let Some(resource) = ctx.search.data.current_resource().cloned() else {
            ctx.search.set_error(DispatchError::NotFound);
            return Step::Done;
        };

        if resource.is_exact_match() {
            match resolver.find_method(&resource) {
                Ok(method) => {
                    debug!(
                        resource = %resource.name(),
                        method = %method.name(),
                        "Resource method found"
                    );
                    ctx.search.set_found(FoundMethod::Resource(method));
                }
                Err(err) => ctx.search.set_error(err),
            }
            return Step::Done;
        }

        let tail = normalize(resource.matcher().tail());
        let all = resource.record().matching_sub_resources(tail);
        if all.is_empty() {
            debug!(resource = %resource.name(), tail, "No sub-resource matches");
            ctx.search.set_error(DispatchError::NotFound);
            return Step::Done;
        }
        let candidates = if self.continued_search {
            all.clone()
        } else {
            all.iter().take(1).cloned().collect()
        };
        Step::Descend(Frame {
            resource,
            saved: ctx.search.data.clone(),
            candidates,
            all,
            next: 0,
        })
    }
}

/// Record a sub-resource match: its variables and the segments it consumed.
fn save_found_method(ctx: &mut MessageContext<'_>, matcher: &UriTemplateMatcher) {
    let data = &mut ctx.search.data;
    let segments = ctx.request.segments();
    data.store_variables(matcher);
    let offset = data.consumed_segments();
    let count = data.add_matched_uri(&matcher.head(), segments);
    data.store_variable_segments(matcher, segments, offset, count);
}

fn invoke_locator(
    ctx: &MessageContext<'_>,
    resource: &ResourceInstance,
    locator: &SubResourceInstance,
) -> Result<Option<SubResource>, DispatchError> {
    let MethodTarget::Locator(target) = locator.metadata().target() else {
        return Err(DispatchError::internal(format!(
            "{} is not a sub-resource locator",
            locator.metadata().name()
        )));
    };
    let object = resource.instance(&ctx.request)?;
    let params = bind_parameters(locator.metadata(), ctx)?;
    debug!(resource = %resource.name(), locator = %locator.metadata().name(), "Invoking locator");
    target(&object, &params)
}
