mod common;

use common::{get, processor, processor_with, send};
use http::header::HeaderName;
use http::{Method, StatusCode};
use restdispatch::providers::{ConversionError, FnConverter, FnMapper, FromStrConverter};
use restdispatch::{
    ClassMetadata, DispatchConfig, DispatchError, Entity, MethodMetadata, Outcome,
    ParamDescriptor, Providers, ResponseEnvelope, SingletonFactory,
};
use std::sync::Arc;

type MapperResult = Option<Result<ResponseEnvelope, DispatchError>>;

struct Counter;

fn counter() -> ClassMetadata {
    let describe = |params: &[restdispatch::ParamValue]| -> String {
        params[0]
            .converted::<Option<u32>>()
            .copied()
            .flatten()
            .map_or_else(|| "none".to_string(), |n| n.to_string())
    };
    ClassMetadata::new::<Counter>(SingletonFactory::new(Counter))
        .path("counter")
        .method(
            MethodMetadata::handler("by_query", Method::GET, move |_: &Counter, params| {
                Ok(Outcome::entity(describe(params)))
            })
            .path("query")
            .param(
                ParamDescriptor::query("n").with_converter(FromStrConverter::<u32>::new()),
            ),
        )
        .method(
            MethodMetadata::handler("by_header", Method::GET, move |_: &Counter, params| {
                Ok(Outcome::entity(describe(params)))
            })
            .path("header")
            .param(
                ParamDescriptor::header("x-count").with_converter(FromStrConverter::<u32>::new()),
            ),
        )
        .method(
            MethodMetadata::handler("by_path", Method::GET, move |_: &Counter, params| {
                Ok(Outcome::entity(describe(params)))
            })
            .path("path/{n}")
            .param(ParamDescriptor::path("n").with_converter(FromStrConverter::<u32>::new())),
        )
        .method(
            MethodMetadata::handler("gated", Method::GET, |_: &Counter, _| {
                Ok(Outcome::entity(String::from("open")))
            })
            .path("gated")
            .param(ParamDescriptor::query("token").with_converter(FnConverter(
                |values: &[String]| match values.first().map(String::as_str) {
                    Some("letmein") => Ok(Arc::new(()) as restdispatch::providers::ConvertedValue),
                    _ => Err(ConversionError::Response(ResponseEnvelope::status(
                        StatusCode::UNAUTHORIZED,
                    ))),
                },
            ))),
        )
}

#[test]
fn test_converted_parameters() {
    let processor = processor(DispatchConfig::default(), vec![counter()]);
    assert_eq!(get(&processor, "/counter/query?n=5").body_text(), "5");
    assert_eq!(get(&processor, "/counter/query").body_text(), "none");
    assert_eq!(get(&processor, "/counter/path/12").body_text(), "12");

    let header = send(
        &processor,
        Method::GET,
        "/counter/header",
        &[(HeaderName::from_static("x-count"), "7")],
    );
    assert_eq!(header.body_text(), "7");
}

#[test]
fn test_conversion_failures_by_parameter_kind() {
    let processor = processor(DispatchConfig::default(), vec![counter()]);
    assert_eq!(
        get(&processor, "/counter/query?n=abc").status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&processor, "/counter/path/abc").status_code(),
        StatusCode::NOT_FOUND
    );
    let header = send(
        &processor,
        Method::GET,
        "/counter/header",
        &[(HeaderName::from_static("x-count"), "many")],
    );
    assert_eq!(header.status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_converter_response_is_sent_as_is() {
    let processor = processor(DispatchConfig::default(), vec![counter()]);
    assert_eq!(
        get(&processor, "/counter/gated").status_code(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        get(&processor, "/counter/gated?token=letmein").body_text(),
        "open"
    );
}

#[derive(Debug)]
struct Outage;

impl std::fmt::Display for Outage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("database unavailable")
    }
}

impl std::error::Error for Outage {}

struct Orders;

fn orders() -> ClassMetadata {
    ClassMetadata::new::<Orders>(SingletonFactory::new(Orders))
        .path("orders")
        .method(MethodMetadata::handler("list", Method::GET, |_: &Orders, _| {
            Err(DispatchError::application(Outage))
        }))
        .method(
            MethodMetadata::handler("teapot", Method::GET, |_: &Orders, _| {
                Err(DispatchError::Web(
                    ResponseEnvelope::status(StatusCode::IM_A_TEAPOT)
                        .entity(Entity::new(String::from("short and stout"))),
                ))
            })
            .path("teapot"),
        )
}

#[test]
fn test_application_error_without_mapper() {
    let processor = processor(DispatchConfig::default(), vec![orders()]);
    let response = get(&processor, "/orders");
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().is_empty());

    let teapot = get(&processor, "/orders/teapot");
    assert_eq!(teapot.status_code(), StatusCode::IM_A_TEAPOT);
    assert_eq!(teapot.body_text(), "short and stout");
}

#[test]
fn test_exception_mapper_replaces_response() {
    let mut providers = Providers::with_defaults();
    providers.add_mapper(FnMapper(|err: &DispatchError| -> MapperResult {
        matches!(err, DispatchError::Application(_)).then(|| {
            Ok(ResponseEnvelope::status(StatusCode::SERVICE_UNAVAILABLE)
                .entity(Entity::new(String::from("retry later"))))
        })
    }));
    let processor = processor_with(DispatchConfig::default(), providers, vec![orders()]);

    let response = get(&processor, "/orders");
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(response.body_text(), "retry later");

    // Declined errors keep their default rendering.
    assert_eq!(
        get(&processor, "/orders/missing").status_code(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_failing_mapper_degrades_to_internal_error() {
    let mut providers = Providers::with_defaults();
    providers.add_mapper(FnMapper(|_: &DispatchError| -> MapperResult {
        Some(Err(DispatchError::internal("mapper broke")))
    }));
    let processor = processor_with(DispatchConfig::default(), providers, vec![orders()]);
    let response = get(&processor, "/orders/nowhere");
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

struct Fragile;

#[test]
fn test_panicking_handler_is_contained() {
    let class = ClassMetadata::new::<Fragile>(SingletonFactory::new(Fragile))
        .path("fragile")
        .method(MethodMetadata::handler("break", Method::GET, |_: &Fragile, _| {
            panic!("handler bug")
        }))
        .method(
            MethodMetadata::handler("fine", Method::GET, |_: &Fragile, _| {
                Ok(Outcome::entity(String::from("still serving")))
            })
            .path("fine"),
        );
    let processor = processor(DispatchConfig::default(), vec![class]);
    assert_eq!(
        get(&processor, "/fragile").status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        get(&processor, "/fragile/fine").body_text(),
        "still serving"
    );
}
