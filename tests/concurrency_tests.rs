mod common;

use common::{continued, processor, Lifecycle};
use http::{Method, StatusCode};
use restdispatch::{ClassMetadata, MethodMetadata, Outcome, ParamDescriptor, Request};
use std::sync::Arc;
use std::thread;

struct Pets;

fn pets(lifecycle: &Lifecycle) -> ClassMetadata {
    ClassMetadata::new::<Pets>(lifecycle.factory(|| Pets))
        .path("pets")
        .method(
            MethodMetadata::handler("get", Method::GET, |_: &Pets, params| {
                Ok(Outcome::entity(format!(
                    "pet {}",
                    params[0].as_str().unwrap_or_default()
                )))
            })
            .path("{id}")
            .param(ParamDescriptor::path("id")),
        )
        .method(MethodMetadata::handler("list", Method::GET, |_: &Pets, _| {
            Ok(Outcome::entity(String::from("all pets")))
        }))
}

#[test]
fn test_shared_processor_across_threads() {
    let lifecycle = Lifecycle::default();
    let processor = Arc::new(processor(continued(), vec![pets(&lifecycle)]));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let processor = Arc::clone(&processor);
            thread::spawn(move || {
                for i in 0..50 {
                    let id = worker * 100 + i;
                    let path = format!("/pets/{}", id);
                    let response = processor.dispatch(Request::new(Method::GET, &path));
                    assert_eq!(response.status_code(), StatusCode::OK);
                    assert_eq!(response.body_text(), format!("pet {}", id));

                    let missing = processor.dispatch(Request::new(Method::GET, "/cats"));
                    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(lifecycle.created(), 400);
    assert_eq!(lifecycle.released(), 400);
    assert_eq!(
        processor
            .dispatch(Request::new(Method::GET, "/pets"))
            .body_text(),
        "all pets"
    );
}
