//! # Dispatcher Module
//!
//! Resolves a request to the resource method that will handle it.
//!
//! ## Overview
//!
//! [`DispatchPipeline::find_resource`] walks from the registry's root
//! candidates through sub-resource methods and locators until one method
//! accepts the request:
//!
//! 1. Root resources whose template matches the (matrix-stripped) path are
//!    tried in rank order.
//! 2. An exactly matched resource selects one of its own methods by verb and
//!    media types.
//! 3. Otherwise the unmatched tail is matched against the resource's
//!    sub-resource templates. A sub-resource method ends the search; a
//!    locator is invoked and the object it returns becomes the next resource.
//!
//! Everything matched along the way (variables, consumed URIs, resource
//! objects) accumulates in [`AccumulatedData`], newest first. The result,
//! found method or failure, lands in [`SearchResult`], and [`UriInfo`] is
//! the read-only view resource methods receive.
//!
//! All per-request state lives in [`MessageContext`], which the pipeline
//! stages pass along.

mod context;
mod core;
mod search;

pub use context::MessageContext;
pub use core::DispatchPipeline;
pub use search::{AccumulatedData, FoundMethod, SearchResult, UriInfo};
