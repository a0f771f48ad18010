mod common;

use common::{get, processor, Lifecycle};
use http::{Method, StatusCode};
use restdispatch::{
    ClassMetadata, ContextKind, DispatchConfig, DispatchError, MethodMetadata, Outcome,
    ParamDescriptor, ResponseEnvelope, SingletonFactory, SubResource,
};
use std::sync::Arc;

struct UriInfoDetailedMethods;

struct MatchedResourcesSubResource {
    prefix: String,
}

fn names(params: &[restdispatch::ParamValue]) -> String {
    params[0]
        .uri_info()
        .map(|info| {
            info.matched_resource_names()
                .iter()
                .map(|name| format!("{}:", name))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn uri_info_resource() -> ClassMetadata {
    let sub = Arc::new(
        ClassMetadata::sub_resource::<MatchedResourcesSubResource>().method(
            MethodMetadata::handler(
                "describe",
                Method::GET,
                |sub: &MatchedResourcesSubResource, params| {
                    let info = params[0].uri_info().map(|i| i.matched_uris(false).join(","));
                    Ok(Outcome::entity(format!(
                        "{}-{}|{}",
                        sub.prefix,
                        names(params),
                        info.unwrap_or_default()
                    )))
                },
            )
            .param(ParamDescriptor::context(ContextKind::UriInfo)),
        ),
    );
    ClassMetadata::new::<UriInfoDetailedMethods>(SingletonFactory::new(UriInfoDetailedMethods))
        .path("uriinfo")
        .method(
            MethodMetadata::locator(
                "matchedresources",
                "matchedresources",
                move |_: &UriInfoDetailedMethods, params| {
                    let prefix = names(params);
                    Ok(Some(SubResource::new(
                        MatchedResourcesSubResource { prefix },
                        Arc::clone(&sub),
                    )))
                },
            )
            .param(ParamDescriptor::context(ContextKind::UriInfo)),
        )
}

#[test]
fn test_matched_resources_seen_from_locator_and_sub_resource() {
    let processor = processor(DispatchConfig::default(), vec![uri_info_resource()]);
    let response = get(&processor, "/uriinfo/matchedresources");
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.body_text(),
        "UriInfoDetailedMethods:-MatchedResourcesSubResource:UriInfoDetailedMethods:|uriinfo/matchedresources,uriinfo"
    );
}

struct Library;
struct Shelf {
    shelf: String,
    sort: Option<String>,
}

fn library() -> ClassMetadata {
    let shelf_class = Arc::new(
        ClassMetadata::sub_resource::<Shelf>().method(
            MethodMetadata::handler("book", Method::GET, |shelf: &Shelf, params| {
                let matched = params[3]
                    .uri_info()
                    .and_then(|info| info.matched_uris(false).first().cloned())
                    .unwrap_or_default();
                Ok(Outcome::entity(format!(
                    "{} sorted {} / {} edition {} / shelf {} @ {}",
                    shelf.shelf,
                    shelf.sort.as_deref().unwrap_or("-"),
                    params[0].as_str().unwrap_or("-"),
                    params[1].as_str().unwrap_or("-"),
                    params[2].as_str().unwrap_or("-"),
                    matched,
                )))
            })
            .path("{book}")
            .param(ParamDescriptor::path("book"))
            .param(ParamDescriptor::matrix("edition"))
            .param(ParamDescriptor::path("shelf"))
            .param(ParamDescriptor::context(ContextKind::UriInfo)),
        ),
    );
    ClassMetadata::new::<Library>(SingletonFactory::new(Library))
        .path("library")
        .method(
            MethodMetadata::locator("shelf", "{shelf}", move |_: &Library, params| {
                if params[0].as_str() == Some("closed") {
                    return Ok(None);
                }
                if params[0].as_str() == Some("private") {
                    return Err(DispatchError::Web(ResponseEnvelope::status(
                        StatusCode::FORBIDDEN,
                    )));
                }
                Ok(Some(SubResource::new(
                    Shelf {
                        shelf: params[0].as_str().unwrap_or_default().to_string(),
                        sort: params[1].as_str().map(str::to_string),
                    },
                    Arc::clone(&shelf_class),
                )))
            })
            .param(ParamDescriptor::path("shelf"))
            .param(ParamDescriptor::matrix("sort")),
        )
}

#[test]
fn test_matrix_params_follow_each_hop() {
    let processor = processor(DispatchConfig::default(), vec![library()]);
    let response = get(&processor, "/library/fiction;sort=asc/moby;edition=2");
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.body_text(),
        "fiction sorted asc / moby edition 2 / shelf fiction @ library/fiction;sort=asc/moby;edition=2"
    );

    let plain = get(&processor, "/library/poetry/odes");
    assert_eq!(
        plain.body_text(),
        "poetry sorted - / odes edition - / shelf poetry @ library/poetry/odes"
    );
}

#[test]
fn test_locator_outcomes() {
    let processor = processor(DispatchConfig::default(), vec![library()]);
    assert_eq!(
        get(&processor, "/library/closed/any").status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&processor, "/library/private/any").status_code(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        get(&processor, "/library/fiction;sort=asc/moby;edition=2/extra").status_code(),
        StatusCode::NOT_FOUND
    );
}

struct Outer;
struct Middle;
struct Inner {
    depth: usize,
}

#[test]
fn test_nested_locators_release_root_instance() {
    let lifecycle = Lifecycle::default();
    let inner = Arc::new(ClassMetadata::sub_resource::<Inner>().method(
        MethodMetadata::handler("leaf", Method::GET, |inner: &Inner, params| {
            let info = params[0].uri_info();
            let path = info.map(|i| i.path(true)).unwrap_or_default();
            let id = info.and_then(|i| i.path_parameter("id")).unwrap_or_default();
            Ok(Outcome::entity(format!("depth {} at {} id {}", inner.depth, path, id)))
        })
        .param(ParamDescriptor::context(ContextKind::UriInfo)),
    ));
    let middle = Arc::new(ClassMetadata::sub_resource::<Middle>().method(
        MethodMetadata::locator("inner", "inner/{id}", move |_: &Middle, _| {
            Ok(Some(SubResource::new(Inner { depth: 2 }, Arc::clone(&inner))))
        }),
    ));
    let outer = ClassMetadata::new::<Outer>(lifecycle.factory(|| Outer))
        .path("outer/{id}")
        .method(MethodMetadata::locator(
            "middle",
            "middle",
            move |_: &Outer, _| Ok(Some(SubResource::new(Middle, Arc::clone(&middle)))),
        ));
    let processor = processor(DispatchConfig::default(), vec![outer]);

    let response = get(&processor, "/outer/1/middle/inner/2");
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.body_text(),
        "depth 2 at outer/1/middle/inner/2 id 2"
    );
    assert_eq!(lifecycle.created(), 1);
    assert_eq!(lifecycle.released(), 1);
}
