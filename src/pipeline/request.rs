use http::Method;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::binding::bind_parameters;
use super::{RequestChain, RequestStage};
use crate::dispatcher::{DispatchPipeline, MessageContext, SearchResult};
use crate::error::DispatchError;
use crate::metadata::MethodTarget;

/// Runs the rest of the chain, then fails the request if no method was found.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchResultCheck;

impl RequestStage for SearchResultCheck {
    fn name(&self) -> &'static str {
        "search_result_check"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        chain.proceed(ctx)?;
        if ctx.search.is_found() {
            return Ok(());
        }
        Err(ctx.search.error().cloned().unwrap_or(DispatchError::NotFound))
    }
}

/// Serves HEAD from a GET method, without a body, when no method handles HEAD.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadFallback;

impl RequestStage for HeadFallback {
    fn name(&self) -> &'static str {
        "head_fallback"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        chain.proceed(ctx)?;

        let not_allowed = matches!(
            ctx.search.error(),
            Some(DispatchError::MethodNotAllowed { .. })
        );
        if ctx.request.method() == Method::HEAD && !ctx.search.is_found() && not_allowed {
            debug!(path = %ctx.request.path(), "No HEAD method; retrying as GET without a body");
            ctx.search.data().release_all(&ctx.request);
            ctx.request.set_method(Method::GET);
            ctx.search = SearchResult::new();
            ctx.discard_body = true;
            chain.proceed(ctx)?;
        }
        Ok(())
    }
}

/// Root resource and method search; the rest of the chain only runs when a
/// method was found.
#[derive(Debug, Clone, Copy)]
pub struct FindResource {
    pipeline: DispatchPipeline,
}

impl FindResource {
    #[must_use]
    pub fn new(pipeline: DispatchPipeline) -> Self {
        Self { pipeline }
    }
}

impl RequestStage for FindResource {
    fn name(&self) -> &'static str {
        "find_resource"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        self.pipeline.find_resource(ctx)?;
        if !ctx.search.is_found() {
            info!(
                method = %ctx.request.method(),
                path = %ctx.request.path(),
                status = ?ctx.search.error().map(DispatchError::status),
                "No method found"
            );
            return Ok(());
        }
        chain.proceed(ctx)
    }
}

/// Binds the found method's parameters into `ctx.search`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateInvocationParameters;

impl RequestStage for CreateInvocationParameters {
    fn name(&self) -> &'static str {
        "create_invocation_parameters"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        let method = ctx
            .search
            .method()
            .map(|found| Arc::clone(found.metadata()))
            .ok_or_else(|| DispatchError::internal("no method to bind parameters for"))?;
        let params = bind_parameters(&method, ctx)?;
        ctx.search.params = params;
        chain.proceed(ctx)
    }
}

/// Calls the found method on the current resource object and stores its
/// outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvokeMethod;

impl RequestStage for InvokeMethod {
    fn name(&self) -> &'static str {
        "invoke_method"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        let method = ctx
            .search
            .method()
            .map(|found| Arc::clone(found.metadata()))
            .ok_or_else(|| DispatchError::internal("no method to invoke"))?;
        let MethodTarget::Handler(handler) = method.target() else {
            return Err(DispatchError::internal(format!(
                "{} is a locator and cannot handle requests",
                method.name()
            )));
        };
        let resource = ctx
            .search
            .data()
            .current_resource()
            .cloned()
            .ok_or_else(|| DispatchError::internal("no matched resource"))?;
        let object = resource.instance(&ctx.request)?;

        debug!(resource = %resource.name(), method = %method.name(), "Invoking method");
        let params = ctx.search.params();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&object, params)))
            .map_err(|payload| {
                error!(
                    resource = %resource.name(),
                    method = %method.name(),
                    panic = panic_message(&*payload),
                    "Resource method panicked"
                );
                DispatchError::internal(format!("{} panicked", method.name()))
            })??;
        ctx.outcome = Some(outcome);
        chain.proceed(ctx)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
