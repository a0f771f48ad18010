use std::time::Instant;

use ::tracing::{info, info_span, warn};

use super::{RequestChain, RequestStage};
use crate::dispatcher::MessageContext;
use crate::error::DispatchError;

/// Opt-in request stage that wraps the rest of the request chain in a
/// `request` span and logs its latency and result.
///
/// Add it with [`RequestProcessor::with_request_stage`](super::RequestProcessor::with_request_stage)
/// to time parameter-bound method invocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStage;

impl RequestStage for TracingStage {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError> {
        let resource = ctx
            .search
            .data()
            .current_resource()
            .map(|r| r.name().to_string())
            .unwrap_or_default();
        let method = ctx
            .search
            .method()
            .map(|m| m.metadata().name().to_string())
            .unwrap_or_default();
        let span = info_span!(
            "request",
            verb = %ctx.request.method(),
            path = %ctx.request.path(),
            resource = %resource,
            method = %method,
        );
        let _entered = span.enter();

        let started = Instant::now();
        let result = chain.proceed(ctx);
        let latency_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(latency_ms, "Method completed"),
            Err(err) => warn!(
                latency_ms,
                status = err.status().as_u16(),
                error = %err,
                "Method failed"
            ),
        }
        result
    }
}
