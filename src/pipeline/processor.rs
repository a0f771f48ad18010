use http::header::HeaderValue;
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

use super::{
    CreateInvocationParameters, FindResource, FlushResult, HeadFallback, InvokeMethod,
    PopulateErrorResponse, PopulateResponseMediaType, PopulateResponseStatus, RequestChain,
    RequestStage, ResponseChain, ResponseStage, SearchResultCheck,
};
use crate::config::DispatchConfig;
use crate::dispatcher::{DispatchPipeline, MessageContext};
use crate::providers::Providers;
use crate::registry::ResourceRegistry;
use crate::server::{BufferedResponse, Request, ResponseSink};

/// Entry point of the dispatch engine.
///
/// Owns the registry, providers and configuration, and runs every request
/// through the request chain and then the response chain, switching to the
/// error chain on failure. Safe to share across threads: all per-request
/// state lives in the [`MessageContext`] built for each call.
///
/// ```rust,ignore
/// let config = DispatchConfig::from_env();
/// let registry = ResourceRegistry::new(&config);
/// registry.add_resource(ClassMetadata::new::<Pets>(SingletonFactory::new(Pets)).path("pets"))?;
/// let processor = RequestProcessor::new(registry, Providers::with_defaults(), config);
/// let response = processor.dispatch(Request::new(Method::GET, "/pets/7"));
/// ```
pub struct RequestProcessor {
    registry: ResourceRegistry,
    providers: Providers,
    config: DispatchConfig,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
    error_stages: Vec<Arc<dyn ResponseStage>>,
}

impl RequestProcessor {
    #[must_use]
    pub fn new(registry: ResourceRegistry, providers: Providers, config: DispatchConfig) -> Self {
        let pipeline = DispatchPipeline::new(&config);
        let request_stages: Vec<Arc<dyn RequestStage>> = vec![
            Arc::new(SearchResultCheck),
            Arc::new(HeadFallback),
            Arc::new(FindResource::new(pipeline)),
            Arc::new(CreateInvocationParameters),
            Arc::new(InvokeMethod),
        ];
        let response_stages: Vec<Arc<dyn ResponseStage>> = vec![
            Arc::new(PopulateResponseStatus),
            Arc::new(PopulateResponseMediaType),
            Arc::new(FlushResult),
        ];
        let mut error_stages: Vec<Arc<dyn ResponseStage>> = vec![Arc::new(PopulateErrorResponse)];
        error_stages.extend(response_stages.iter().cloned());

        info!(
            continued_search = config.search_policy_continued_search,
            roots = registry.records().len(),
            "Request processor ready"
        );
        Self {
            registry,
            providers,
            config,
            request_stages,
            response_stages,
            error_stages,
        }
    }

    /// Add a request stage; it runs after parameter binding, just before the
    /// method is invoked.
    #[must_use]
    pub fn with_request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        let at = self.request_stages.len().saturating_sub(1);
        self.request_stages.insert(at, Arc::new(stage));
        self
    }

    /// Add a response stage to both the response and error chains; it runs
    /// after media type negotiation, just before the result is flushed.
    #[must_use]
    pub fn with_response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        let stage: Arc<dyn ResponseStage> = Arc::new(stage);
        for stages in [&mut self.response_stages, &mut self.error_stages] {
            let at = stages.len().saturating_sub(1);
            stages.insert(at, Arc::clone(&stage));
        }
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch `request`, writing the response to `sink`.
    ///
    /// Never fails: every error becomes a response. If even the error chain
    /// fails, a bare 500 is sent unless the response was already committed.
    pub fn handle(&self, request: Request, sink: &mut dyn ResponseSink) {
        let span = info_span!(
            "dispatch",
            request_id = %request.request_id(),
            method = %request.method(),
            path = %request.path(),
        );
        let _entered = span.enter();
        let started = Instant::now();

        if let Ok(value) = HeaderValue::from_str(&request.request_id().to_string()) {
            sink.headers_mut().insert("x-request-id", value);
        }

        let mut ctx = MessageContext::new(request, &self.registry, &self.providers, &self.config);
        let result = match RequestChain::new(&self.request_stages).proceed(&mut ctx) {
            Ok(()) => ResponseChain::new(&self.response_stages).proceed(&mut ctx, sink),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            let status = err.status();
            if status.is_server_error() {
                error!(error = %err, status = status.as_u16(), "Request failed");
            } else {
                info!(error = %err, status = status.as_u16(), "Request rejected");
            }
            ctx.error = Some(err);
            let rendered = ResponseChain::new(&self.error_stages).proceed(&mut ctx, sink);
            if let Err(render_err) = rendered {
                error!(error = %render_err, "Failed to render error response");
                if sink.is_committed() {
                    warn!("Response already committed; leaving it truncated");
                } else {
                    sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                    sink.commit();
                }
            }
        }

        ctx.release_resources();
        debug!(
            status = sink.status().map(|s| s.as_u16()),
            latency_ms = started.elapsed().as_millis() as u64,
            "Request dispatched"
        );
    }

    /// Dispatch into an in-memory response.
    #[must_use]
    pub fn dispatch(&self, request: Request) -> BufferedResponse {
        let mut response = BufferedResponse::new();
        self.handle(request, &mut response);
        response
    }

    /// Dispatch an `http::Request` and return an `http::Response`.
    #[must_use]
    pub fn handle_http(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.dispatch(Request::from_http(request)).into_http()
    }
}

impl fmt::Debug for RequestProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |stages: &[Arc<dyn ResponseStage>]| -> Vec<&'static str> {
            stages.iter().map(|s| s.name()).collect()
        };
        f.debug_struct("RequestProcessor")
            .field(
                "request_stages",
                &self.request_stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("response_stages", &names(&self.response_stages))
            .field("error_stages", &names(&self.error_stages))
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Outcome;
    use crate::error::DispatchError;
    use crate::metadata::{ClassMetadata, MethodMetadata};
    use crate::providers::SingletonFactory;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ping;

    fn processor() -> RequestProcessor {
        let config = DispatchConfig::default();
        let registry = ResourceRegistry::new(&config);
        registry
            .add_resource(
                ClassMetadata::new::<Ping>(SingletonFactory::new(Ping))
                    .path("ping")
                    .method(MethodMetadata::handler("ping", Method::GET, |_: &Ping, _| {
                        Ok(Outcome::entity(String::from("pong")))
                    }))
                    .method(
                        MethodMetadata::handler("explode", Method::GET, |_: &Ping, _| {
                            panic!("kaboom")
                        })
                        .path("boom"),
                    ),
            )
            .unwrap();
        RequestProcessor::new(registry, Providers::with_defaults(), config)
    }

    struct Counting(Arc<AtomicUsize>);

    impl RequestStage for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn handle_request(
            &self,
            ctx: &mut MessageContext<'_>,
            chain: RequestChain<'_>,
        ) -> Result<(), DispatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            chain.proceed(ctx)
        }
    }

    struct Stamp;

    impl ResponseStage for Stamp {
        fn name(&self) -> &'static str {
            "stamp"
        }

        fn handle_response(
            &self,
            ctx: &mut MessageContext<'_>,
            sink: &mut dyn ResponseSink,
            chain: ResponseChain<'_>,
        ) -> Result<(), DispatchError> {
            ctx.response_headers
                .insert("x-stamp", HeaderValue::from_static("1"));
            chain.proceed(ctx, sink)
        }
    }

    #[test]
    fn test_dispatch_round_trip() {
        let response = processor().dispatch(Request::new(Method::GET, "/ping"));
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.body_text(), "pong");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert!(response.header("x-request-id").is_some());
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let response = processor().dispatch(Request::new(Method::GET, "/nowhere"));
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_panicking_method_is_internal_error() {
        let response = processor().dispatch(Request::new(Method::GET, "/ping/boom"));
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_user_stages_run_in_place() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = processor()
            .with_request_stage(Counting(Arc::clone(&calls)))
            .with_response_stage(Stamp);
        assert_eq!(
            processor.request_stages.last().map(|s| s.name()),
            Some("invoke_method")
        );
        assert_eq!(
            processor.error_stages.last().map(|s| s.name()),
            Some("flush_result")
        );

        let ok = processor.dispatch(Request::new(Method::GET, "/ping"));
        assert_eq!(ok.header("x-stamp"), Some("1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let missing = processor.dispatch(Request::new(Method::GET, "/missing"));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.header("x-stamp"), Some("1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_http() {
        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/ping")
            .body(Vec::new())
            .unwrap();
        let response = processor().handle_http(request);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"pong");
    }
}
