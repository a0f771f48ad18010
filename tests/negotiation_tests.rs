mod common;

use common::{get, processor, send};
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{Method, StatusCode};
use restdispatch::config::MediaTypeMapping;
use restdispatch::{
    ClassMetadata, DispatchConfig, Entity, MediaType, MethodMetadata, Outcome, ParamDescriptor,
    ResponseEnvelope, SingletonFactory,
};
use serde_json::json;

struct Document;

fn document() -> ClassMetadata {
    ClassMetadata::new::<Document>(SingletonFactory::new(Document))
        .path("document")
        .method(
            MethodMetadata::handler("as_json", Method::GET, |_: &Document, _| {
                Ok(Outcome::entity(json!({ "kind": "json" })))
            })
            .produces(MediaType::application_json()),
        )
        .method(
            MethodMetadata::handler("as_text", Method::GET, |_: &Document, _| {
                Ok(Outcome::entity(String::from("kind: text")))
            })
            .produces(MediaType::text_plain()),
        )
        .method(
            MethodMetadata::handler("create", Method::POST, |_: &Document, params| {
                let body = params[0]
                    .entity()
                    .and_then(|e| e.downcast_ref::<serde_json::Value>())
                    .cloned()
                    .unwrap_or_default();
                Ok(Outcome::Response(
                    ResponseEnvelope::status(StatusCode::CREATED).entity(Entity::new(body)),
                ))
            })
            .consumes(MediaType::application_json())
            .param(ParamDescriptor::entity::<serde_json::Value>()),
        )
}

#[test]
fn test_accept_selects_method() {
    let processor = processor(DispatchConfig::default(), vec![document()]);

    let json = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "text/plain;q=0.5, application/json")],
    );
    assert_eq!(json.status_code(), StatusCode::OK);
    assert_eq!(json.header("content-type"), Some("application/json"));
    assert_eq!(json.body_text(), r#"{"kind":"json"}"#);
    assert_eq!(json.header("vary"), Some("Accept"));

    let text = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "text/plain")],
    );
    assert_eq!(text.header("content-type"), Some("text/plain"));
    assert_eq!(text.body_text(), "kind: text");
}

#[test]
fn test_nothing_acceptable() {
    let processor = processor(DispatchConfig::default(), vec![document()]);
    let response = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "image/png")],
    );
    assert_eq!(response.status_code(), StatusCode::NOT_ACCEPTABLE);
    assert!(response.body().is_empty());
}

#[test]
fn test_vary_header_can_be_disabled() {
    let config = DispatchConfig {
        add_vary_header: false,
        ..DispatchConfig::default()
    };
    let processor = processor(config, vec![document()]);
    let response = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "text/plain")],
    );
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("vary"), None);
}

#[test]
fn test_json_entity_round_trip() {
    let processor = processor(DispatchConfig::default(), vec![document()]);
    let request = restdispatch::Request::new(Method::POST, "/document")
        .with_header(CONTENT_TYPE, "application/json".parse().unwrap())
        .with_body(r#"{"name":"rex"}"#);
    let response = processor.dispatch(request);
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.body_text(), r#"{"name":"rex"}"#);
    assert_eq!(response.header("vary"), None);

    let malformed = restdispatch::Request::new(Method::POST, "/document")
        .with_header(CONTENT_TYPE, "application/json".parse().unwrap())
        .with_body("{not json");
    assert_eq!(
        processor.dispatch(malformed).status_code(),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_media_type_mapper_rewrites_for_matching_clients() {
    let config = DispatchConfig {
        media_type_mapper: vec![MediaTypeMapping {
            user_agent_prefix: "Legacy/".to_string(),
            result_type: "application/json".to_string(),
            replacement: "application/vnd.legacy+json".to_string(),
        }],
        ..DispatchConfig::default()
    };
    let processor = processor(config, vec![document()]);

    let legacy = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "application/json"), (USER_AGENT, "Legacy/1.0")],
    );
    assert_eq!(legacy.status_code(), StatusCode::OK);
    assert_eq!(
        legacy.header("content-type"),
        Some("application/vnd.legacy+json")
    );
    assert_eq!(legacy.body_text(), r#"{"kind":"json"}"#);

    let modern = send(
        &processor,
        Method::GET,
        "/document",
        &[(ACCEPT, "application/json"), (USER_AGENT, "Modern/2.0")],
    );
    assert_eq!(modern.header("content-type"), Some("application/json"));
}

struct Download;

#[test]
fn test_raw_bytes_fall_back_to_octet_stream() {
    let class = ClassMetadata::new::<Download>(SingletonFactory::new(Download))
        .path("download")
        .method(MethodMetadata::handler("fetch", Method::GET, |_: &Download, _| {
            Ok(Outcome::entity(vec![1u8, 2, 3]))
        }));
    let processor = processor(DispatchConfig::default(), vec![class]);
    let response = get(&processor, "/download");
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header("content-type"),
        Some("application/octet-stream")
    );
    assert_eq!(response.body(), &[1u8, 2, 3][..]);
}

struct Report;

fn report() -> ClassMetadata {
    ClassMetadata::new::<Report>(SingletonFactory::new(Report))
        .path("report")
        .method(
            MethodMetadata::handler("render", Method::GET, |_: &Report, _| {
                Ok(Outcome::entity(String::from("quarterly")))
            })
            .produces(MediaType::text_plain())
            .produces(MediaType::parse("text/html").unwrap()),
        )
}

#[test]
fn test_refused_type_is_never_chosen() {
    let processor = processor(DispatchConfig::default(), vec![report()]);

    let response = send(
        &processor,
        Method::GET,
        "/report",
        &[(ACCEPT, "text/plain;q=0, text/*")],
    );
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.body_text(), "quarterly");

    let response = send(&processor, Method::GET, "/report", &[(ACCEPT, "text/*")]);
    assert_eq!(response.header("content-type"), Some("text/plain"));

    let response = send(
        &processor,
        Method::GET,
        "/report",
        &[(ACCEPT, "text/*;q=0, */*")],
    );
    assert_eq!(response.status_code(), StatusCode::NOT_ACCEPTABLE);
}
