//! # Providers Module
//!
//! Pluggable collaborators the dispatch engine consumes but does not
//! implement itself:
//!
//! - [`ObjectFactory`] produces and releases resource objects;
//! - [`MessageBodyReader`] / [`MessageBodyWriter`] convert entities to and
//!   from the wire, with [`ContentHandler`] as a MIME-keyed fallback;
//! - [`ParamConverter`] turns raw parameter strings into typed values;
//! - [`ExceptionMapper`] substitutes custom responses for errors;
//! - [`ResourceValidator`] decides which classes may be registered.
//!
//! [`Providers`] is the lookup table for the body and mapper providers.
//! Registration order matters: lookups return the most recently added
//! provider that accepts the query.

mod body;
mod convert;
mod factory;
mod mapper;

use std::sync::Arc;
use tracing::debug;

pub use body::{
    BytesContentHandler, ContentHandler, JsonProvider, MessageBodyReader, MessageBodyWriter,
    TextProvider,
};
pub use convert::{ConversionError, ConvertedValue, FnConverter, FromStrConverter, ParamConverter};
pub use factory::{
    InstanceFactory, ObjectFactory, PerRequestFactory, ResourceObject, SingletonFactory,
};
pub use mapper::{ExceptionMapper, FnMapper};

use crate::entity::{ResponseEnvelope, TypeInfo};
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::metadata::ClassMetadata;

/// Registry of body readers, writers, exception mappers and content handlers.
#[derive(Clone, Default)]
pub struct Providers {
    readers: Vec<Arc<dyn MessageBodyReader>>,
    writers: Vec<Arc<dyn MessageBodyWriter>>,
    mappers: Vec<Arc<dyn ExceptionMapper>>,
    content_handlers: Vec<(MediaType, Arc<dyn ContentHandler>)>,
}

impl Providers {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON and text readers/writers plus a raw bytes content handler for
    /// `application/octet-stream` and `text/*`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut providers = Self::new();
        providers
            .add_reader(JsonProvider)
            .add_reader(TextProvider)
            .add_writer(JsonProvider)
            .add_writer(TextProvider)
            .add_content_handler(MediaType::application_octet_stream(), BytesContentHandler)
            .add_content_handler(MediaType::new("text", "*"), BytesContentHandler);
        providers
    }

    pub fn add_reader(&mut self, reader: impl MessageBodyReader + 'static) -> &mut Self {
        self.readers.insert(0, Arc::new(reader));
        self
    }

    pub fn add_writer(&mut self, writer: impl MessageBodyWriter + 'static) -> &mut Self {
        self.writers.insert(0, Arc::new(writer));
        self
    }

    pub fn add_mapper(&mut self, mapper: impl ExceptionMapper + 'static) -> &mut Self {
        self.mappers.insert(0, Arc::new(mapper));
        self
    }

    pub fn add_content_handler(
        &mut self,
        media_type: MediaType,
        handler: impl ContentHandler + 'static,
    ) -> &mut Self {
        self.content_handlers.insert(0, (media_type, Arc::new(handler)));
        self
    }

    /// Reader able to produce `target` from a body of `media_type`.
    #[must_use]
    pub fn reader(
        &self,
        target: TypeInfo,
        media_type: &MediaType,
    ) -> Option<Arc<dyn MessageBodyReader>> {
        self.readers
            .iter()
            .find(|r| r.is_readable(target, media_type))
            .cloned()
    }

    /// Writer able to serialise a `raw`/`generic` entity as `media_type`.
    #[must_use]
    pub fn writer(
        &self,
        raw: TypeInfo,
        generic: TypeInfo,
        media_type: &MediaType,
    ) -> Option<Arc<dyn MessageBodyWriter>> {
        let found = self
            .writers
            .iter()
            .find(|w| w.is_writeable(raw, generic, media_type))
            .cloned();
        debug!(
            entity_type = raw.name(),
            media_type = %media_type,
            found = found.is_some(),
            "Writer lookup"
        );
        found
    }

    /// Every media type some writer can emit for this entity type, in
    /// registration priority order without duplicates.
    #[must_use]
    pub fn writer_media_types(&self, raw: TypeInfo, generic: TypeInfo) -> Vec<MediaType> {
        let mut out: Vec<MediaType> = Vec::new();
        for writer in &self.writers {
            for media_type in writer.media_types() {
                if writer.is_writeable(raw, generic, &media_type)
                    && !out.iter().any(|m| m.same_essence(&media_type))
                {
                    out.push(media_type);
                }
            }
        }
        out
    }

    /// First mapper that claims `error`.
    #[must_use]
    pub fn map_error(
        &self,
        error: &DispatchError,
    ) -> Option<Result<ResponseEnvelope, DispatchError>> {
        self.mappers.iter().find_map(|m| m.to_response(error))
    }

    /// Content handler registered for a type covering `media_type`.
    #[must_use]
    pub fn content_handler(&self, media_type: &MediaType) -> Option<Arc<dyn ContentHandler>> {
        self.content_handlers
            .iter()
            .find(|(key, _)| key.covers(media_type))
            .map(|(_, handler)| Arc::clone(handler))
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .field("mappers", &self.mappers.len())
            .field("content_handlers", &self.content_handlers.len())
            .finish()
    }
}

/// Decides whether a class may be registered as a root resource.
pub trait ResourceValidator: Send + Sync {
    fn is_valid(&self, class: &ClassMetadata) -> bool;
}

/// Accepts classes with a root path and at least one method or locator.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResourceValidator;

impl ResourceValidator for DefaultResourceValidator {
    fn is_valid(&self, class: &ClassMetadata) -> bool {
        class.root_path().is_some() && !class.methods().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    type MapperResult = Option<Result<ResponseEnvelope, DispatchError>>;

    #[test]
    fn test_default_writer_lookup() {
        let providers = Providers::with_defaults();
        let json = MediaType::application_json();
        let value = TypeInfo::of::<serde_json::Value>();
        assert!(providers.writer(value, value, &json).is_some());
        assert!(providers
            .writer(value, value, &MediaType::text_plain())
            .is_none());

        let text = TypeInfo::of::<String>();
        let types = providers.writer_media_types(text, text);
        assert_eq!(types, vec![MediaType::text_plain()]);
        assert!(providers
            .writer_media_types(TypeInfo::of::<u8>(), TypeInfo::of::<u8>())
            .is_empty());
    }

    #[test]
    fn test_latest_mapper_wins() {
        let mut providers = Providers::new();
        providers
            .add_mapper(FnMapper(|_: &DispatchError| -> MapperResult {
                Some(Ok(ResponseEnvelope::status(StatusCode::GONE)))
            }))
            .add_mapper(FnMapper(|e: &DispatchError| -> MapperResult {
                e.is_not_found()
                    .then(|| Ok(ResponseEnvelope::status(StatusCode::IM_A_TEAPOT)))
            }));

        let mapped = providers.map_error(&DispatchError::NotFound).unwrap().unwrap();
        assert_eq!(mapped.status, Some(StatusCode::IM_A_TEAPOT));
        let mapped = providers
            .map_error(&DispatchError::NotAcceptable)
            .unwrap()
            .unwrap();
        assert_eq!(mapped.status, Some(StatusCode::GONE));
    }

    #[test]
    fn test_content_handler_by_mime() {
        let providers = Providers::with_defaults();
        assert!(providers
            .content_handler(&MediaType::new("text", "csv"))
            .is_some());
        assert!(providers
            .content_handler(&MediaType::application_octet_stream())
            .is_some());
        assert!(providers
            .content_handler(&MediaType::new("image", "png"))
            .is_none());
    }
}
