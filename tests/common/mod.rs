#![allow(dead_code)]

use http::header::{HeaderName, HeaderValue};
use http::Method;
use restdispatch::{
    BufferedResponse, ClassMetadata, DispatchConfig, MethodMetadata, Outcome, Providers, Request,
    RequestProcessor, ResourceRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Build a processor over the given classes with default providers.
pub fn processor(config: DispatchConfig, classes: Vec<ClassMetadata>) -> RequestProcessor {
    processor_with(config, Providers::with_defaults(), classes)
}

pub fn processor_with(
    config: DispatchConfig,
    providers: Providers,
    classes: Vec<ClassMetadata>,
) -> RequestProcessor {
    let registry = ResourceRegistry::new(&config);
    for class in classes {
        assert!(registry.add_resource(class).unwrap(), "class rejected");
    }
    RequestProcessor::new(registry, providers, config)
}

pub fn continued() -> DispatchConfig {
    DispatchConfig {
        search_policy_continued_search: true,
        ..DispatchConfig::default()
    }
}

/// Resource method returning a fixed text entity.
pub fn text<T: Send + Sync + 'static>(
    name: &str,
    verb: Method,
    body: &'static str,
) -> MethodMetadata {
    MethodMetadata::handler(name, verb, move |_: &T, _| Ok(Outcome::entity(body.to_string())))
}

pub fn get(processor: &RequestProcessor, target: &str) -> BufferedResponse {
    processor.dispatch(Request::new(Method::GET, target))
}

pub fn send(
    processor: &RequestProcessor,
    method: Method,
    target: &str,
    headers: &[(HeaderName, &'static str)],
) -> BufferedResponse {
    let mut request = Request::new(method, target);
    for (name, value) in headers {
        request = request.with_header(name.clone(), HeaderValue::from_static(value));
    }
    processor.dispatch(request)
}

/// Counts objects handed out and released by a factory.
#[derive(Debug, Default, Clone)]
pub struct Lifecycle {
    pub created: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl Lifecycle {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Per-request factory building `T` with `make` and counting both ends.
    pub fn factory<T, F>(&self, make: F) -> restdispatch::PerRequestFactory
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let created = Arc::clone(&self.created);
        let released = Arc::clone(&self.released);
        restdispatch::PerRequestFactory::new(move |_req: &Request| {
            created.fetch_add(1, Ordering::SeqCst);
            make()
        })
        .on_release(move |_object, _req| {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}
