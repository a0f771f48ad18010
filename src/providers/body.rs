use serde_json::Value;
use std::io::{self, Write};

use crate::entity::{Entity, TypeInfo};
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::server::EntityStream;

/// Serialises entities of some types into some media types.
pub trait MessageBodyWriter: Send + Sync {
    /// Media types this writer can emit; consulted when a method declares none.
    fn media_types(&self) -> Vec<MediaType>;

    fn is_writeable(&self, raw: TypeInfo, generic: TypeInfo, media_type: &MediaType) -> bool;

    /// Exact body length when known up front; becomes `Content-Length`.
    fn size(&self, _entity: &Entity, _media_type: &MediaType) -> Option<u64> {
        None
    }

    fn write_to(
        &self,
        entity: &Entity,
        media_type: &MediaType,
        out: &mut EntityStream<'_>,
    ) -> io::Result<()>;
}

/// Deserialises a request body into an entity of the requested type.
pub trait MessageBodyReader: Send + Sync {
    fn is_readable(&self, target: TypeInfo, media_type: &MediaType) -> bool;

    fn read_from(
        &self,
        target: TypeInfo,
        media_type: &MediaType,
        body: &[u8],
    ) -> Result<Entity, DispatchError>;
}

/// Last-resort serialiser keyed by MIME type, used when no writer matches.
/// Returns `Ok(false)` when it cannot handle the entity.
pub trait ContentHandler: Send + Sync {
    fn write(&self, entity: &Entity, out: &mut EntityStream<'_>) -> io::Result<bool>;
}

/// `serde_json::Value` as `application/json` (and `*/*+json`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProvider;

fn is_json(media_type: &MediaType) -> bool {
    media_type.is_wildcard_type()
        || (media_type.type_() == "application"
            && (media_type.is_wildcard_subtype()
                || media_type.subtype() == "json"
                || media_type.subtype().ends_with("+json")))
}

impl MessageBodyWriter for JsonProvider {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::application_json()]
    }

    fn is_writeable(&self, raw: TypeInfo, _generic: TypeInfo, media_type: &MediaType) -> bool {
        raw.is::<Value>() && is_json(media_type)
    }

    fn size(&self, entity: &Entity, _media_type: &MediaType) -> Option<u64> {
        entity
            .downcast_ref::<Value>()
            .and_then(|v| serde_json::to_vec(v).ok())
            .map(|bytes| bytes.len() as u64)
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &MediaType,
        out: &mut EntityStream<'_>,
    ) -> io::Result<()> {
        let value = entity
            .downcast_ref::<Value>()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "entity is not JSON"))?;
        serde_json::to_writer(&mut *out, value).map_err(io::Error::from)
    }
}

impl MessageBodyReader for JsonProvider {
    fn is_readable(&self, target: TypeInfo, media_type: &MediaType) -> bool {
        target.is::<Value>() && is_json(media_type)
    }

    fn read_from(
        &self,
        _target: TypeInfo,
        _media_type: &MediaType,
        body: &[u8],
    ) -> Result<Entity, DispatchError> {
        serde_json::from_slice::<Value>(body)
            .map(Entity::new)
            .map_err(|e| DispatchError::bad_request(format!("malformed JSON body: {}", e)))
    }
}

/// `String` as any `text/*` type.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextProvider;

fn is_text(media_type: &MediaType) -> bool {
    media_type.is_wildcard_type() || media_type.type_() == "text"
}

impl MessageBodyWriter for TextProvider {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::text_plain()]
    }

    fn is_writeable(&self, raw: TypeInfo, _generic: TypeInfo, media_type: &MediaType) -> bool {
        raw.is::<String>() && is_text(media_type)
    }

    fn size(&self, entity: &Entity, _media_type: &MediaType) -> Option<u64> {
        entity.downcast_ref::<String>().map(|s| s.len() as u64)
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &MediaType,
        out: &mut EntityStream<'_>,
    ) -> io::Result<()> {
        let text = entity
            .downcast_ref::<String>()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "entity is not text"))?;
        out.write_all(text.as_bytes())
    }
}

impl MessageBodyReader for TextProvider {
    fn is_readable(&self, target: TypeInfo, media_type: &MediaType) -> bool {
        target.is::<String>() && (is_text(media_type) || media_type.is_wildcard_subtype())
    }

    fn read_from(
        &self,
        _target: TypeInfo,
        _media_type: &MediaType,
        body: &[u8],
    ) -> Result<Entity, DispatchError> {
        String::from_utf8(body.to_vec())
            .map(Entity::new)
            .map_err(|_| DispatchError::bad_request("request body is not valid UTF-8"))
    }
}

/// Raw bytes (`Vec<u8>`) or text (`String`), written verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesContentHandler;

impl ContentHandler for BytesContentHandler {
    fn write(&self, entity: &Entity, out: &mut EntityStream<'_>) -> io::Result<bool> {
        if let Some(bytes) = entity.downcast_ref::<Vec<u8>>() {
            out.write_all(bytes)?;
            return Ok(true);
        }
        if let Some(text) = entity.downcast_ref::<String>() {
            out.write_all(text.as_bytes())?;
            return Ok(true);
        }
        Ok(false)
    }
}
