//! # Registry Module
//!
//! Resource records and the lookups the dispatcher runs against them.
//!
//! - [`ResourceRegistry`] keeps root resources ordered by priority and
//!   template specificity, and resolves a path to its candidate roots;
//! - [`RecordFactory`] compiles class metadata into [`ResourceRecord`]s,
//!   caching static classes by type;
//! - [`MethodResolver`] filters a matched resource's methods by verb,
//!   consumed and produced media types and picks the best survivor.
//!
//! ## Ordering
//!
//! Roots sort by descending priority, then descending template
//! specificity (literal characters, then variable count, then custom
//! pattern count). Sub-resources sort by specificity with methods ahead of
//! locators on ties. Sorting is stable, so declaration order decides the
//! remaining ties.

mod core;
mod factory;
mod instance;
mod record;
mod resolver;

pub use core::ResourceRegistry;
pub use factory::RecordFactory;
pub use instance::{ResourceInstance, SubResourceInstance};
pub use record::{ResourceRecord, SubResourceRecord};
pub use resolver::{MethodCandidate, MethodResolver};
