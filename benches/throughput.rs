use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use restdispatch::{
    ClassMetadata, DispatchConfig, MethodMetadata, Outcome, ParamDescriptor, Providers, Request,
    RequestProcessor, ResourceRegistry, SingletonFactory, SubResource,
};
use std::hint::black_box;
use std::sync::Arc;

struct Zoo;
struct Habitat {
    id: String,
}

fn processor(config: DispatchConfig) -> RequestProcessor {
    let habitat = Arc::new(
        ClassMetadata::sub_resource::<Habitat>().method(
            MethodMetadata::handler("section", Method::GET, |habitat: &Habitat, params| {
                Ok(Outcome::entity(format!(
                    "{}/{}",
                    habitat.id,
                    params[0].as_str().unwrap_or_default()
                )))
            })
            .path("sections/{section_id}")
            .param(ParamDescriptor::path("section_id")),
        ),
    );
    let registry = ResourceRegistry::new(&config);
    registry
        .add_resource(
            ClassMetadata::new::<Zoo>(SingletonFactory::new(Zoo))
                .path("zoo/animals")
                .method(MethodMetadata::handler("list", Method::GET, |_: &Zoo, _| {
                    Ok(Outcome::entity(String::from("all")))
                }))
                .method(
                    MethodMetadata::handler("get", Method::GET, |_: &Zoo, params| {
                        Ok(Outcome::entity(serde_json::json!({
                            "id": params[0].as_str().unwrap_or_default()
                        })))
                    })
                    .path("{id}")
                    .param(ParamDescriptor::path("id")),
                )
                .method(
                    MethodMetadata::locator(
                        "habitat",
                        "habitats/{habitat_id}",
                        move |_: &Zoo, params| {
                            Ok(Some(SubResource::new(
                                Habitat {
                                    id: params[0].as_str().unwrap_or_default().to_string(),
                                },
                                Arc::clone(&habitat),
                            )))
                        },
                    )
                    .param(ParamDescriptor::path("habitat_id")),
                ),
        )
        .expect("bench resource should register");
    RequestProcessor::new(registry, Providers::with_defaults(), config)
}

fn bench_dispatch_throughput(c: &mut Criterion) {
    let requests = [
        (Method::GET, "/zoo/animals"),
        (Method::GET, "/zoo/animals/123"),
        (Method::GET, "/zoo/animals/habitats/88/sections/5"),
        (Method::PUT, "/zoo/animals/123"),
        (Method::GET, "/nowhere"),
    ];

    for (label, config) in [
        ("dispatch_strict", DispatchConfig::default()),
        (
            "dispatch_continued",
            DispatchConfig {
                search_policy_continued_search: true,
                ..DispatchConfig::default()
            },
        ),
        (
            "dispatch_uncached",
            DispatchConfig {
                root_cache_capacity: 0,
                ..DispatchConfig::default()
            },
        ),
    ] {
        let processor = processor(config);
        c.bench_function(label, |b| {
            b.iter(|| {
                for (method, target) in &requests {
                    let response = processor.dispatch(Request::new(method.clone(), target));
                    black_box(response.status_code());
                }
            })
        });
    }
}

criterion_group!(benches, bench_dispatch_throughput);
criterion_main!(benches);
