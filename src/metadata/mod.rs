//! # Metadata Module
//!
//! Queryable descriptions of resource classes and their methods. The
//! dispatcher only reads these; they are built once with the builder
//! methods on [`ClassMetadata`] and [`MethodMetadata`].
//!
//! ```ignore
//! let metadata = ClassMetadata::new::<Books>(SingletonFactory::new(Books::default()))
//!     .path("books")
//!     .method(
//!         MethodMetadata::handler("get", Method::GET, |books: &Books, params| {
//!             Ok(Outcome::entity(books.get(params[0].as_str())))
//!         })
//!         .path("{id}")
//!         .param(ParamDescriptor::path("id")),
//!     );
//! ```

mod class;
mod method;
mod param;

pub use class::ClassMetadata;
pub use method::{HandlerFn, LocatorFn, MethodMetadata, MethodTarget, SubResource};
pub use param::{ContextKind, ParamDescriptor, ParamKind, ParamValue};
