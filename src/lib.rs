//! # restdispatch
//!
//! **restdispatch** is the request dispatch core of a resource-oriented web
//! framework: given a registry of annotated resource classes, it finds the
//! resource method that should handle an HTTP request, binds the method's
//! parameters, invokes it and writes a negotiated response.
//!
//! It owns no sockets. A transport converts its request into a
//! [`server::Request`], hands it to a [`RequestProcessor`] and receives the
//! response through a [`server::ResponseSink`].
//!
//! ## Architecture
//!
//! - **[`uri`]** - URI templates, match attempts and path segments with matrix parameters
//! - **[`media`]** - Media types and parsed `Accept` headers
//! - **[`metadata`]** - Descriptions of resource classes, methods and parameters
//! - **[`registry`]** - Ordered root resources, the path cache and method selection
//! - **[`dispatcher`]** - Root and sub-resource search, locator traversal, backtracking
//! - **[`pipeline`]** - Request, response and error stage chains and the processor
//! - **[`providers`]** - Body readers and writers, converters, exception mappers, object factories
//! - **[`server`]** - Transport-neutral request and response types
//! - **[`config`]** - Dispatch tunables from YAML and `BRRTR_*` variables
//! - **[`telemetry`]** - Structured logging setup
//!
//! ## Request Flow
//!
//! ```text
//! Request ──▶ find root candidates (registry, cached per stripped path)
//!         ──▶ exact match? select resource method : match sub-resources
//!         ──▶ locator? invoke it, descend into the returned object
//!         ──▶ bind parameters ──▶ invoke ──▶ status, Content-Type ──▶ flush
//!                     any error ──▶ exception mappers ──▶ same response stages
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use http::Method;
//! use restdispatch::{
//!     ClassMetadata, DispatchConfig, MethodMetadata, Outcome, ParamDescriptor, Providers,
//!     Request, RequestProcessor, ResourceRegistry, SingletonFactory,
//! };
//!
//! struct Pets;
//!
//! let config = DispatchConfig::from_env();
//! let registry = ResourceRegistry::new(&config);
//! registry.add_resource(
//!     ClassMetadata::new::<Pets>(SingletonFactory::new(Pets))
//!         .path("pets")
//!         .method(
//!             MethodMetadata::handler("get", Method::GET, |_: &Pets, params| {
//!                 let id = params[0].as_str().unwrap_or_default();
//!                 Ok(Outcome::entity(serde_json::json!({ "id": id })))
//!             })
//!             .path("{id}")
//!             .param(ParamDescriptor::path("id")),
//!         ),
//! )?;
//!
//! let processor = RequestProcessor::new(registry, Providers::with_defaults(), config);
//! let response = processor.dispatch(Request::new(Method::GET, "/pets/7"));
//! assert_eq!(response.body_text(), r#"{"id":"7"}"#);
//! ```
//!
//! ## Logging
//!
//! Every request runs inside a `dispatch` span carrying its request id,
//! verb and path. Search decisions log at `debug`, rejected requests at
//! `info` and server errors at `error`. See [`telemetry`] for installing a
//! subscriber.

pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod ids;
pub mod media;
pub mod metadata;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod server;
pub mod telemetry;
pub mod uri;

pub use config::DispatchConfig;
pub use dispatcher::UriInfo;
pub use entity::{Entity, Outcome, ResponseEnvelope, TypeInfo};
pub use error::DispatchError;
pub use media::{Accept, MediaType};
pub use metadata::{
    ClassMetadata, ContextKind, MethodMetadata, ParamDescriptor, ParamValue, SubResource,
};
pub use pipeline::RequestProcessor;
pub use providers::{PerRequestFactory, Providers, SingletonFactory};
pub use registry::ResourceRegistry;
pub use server::{BufferedResponse, Request};
