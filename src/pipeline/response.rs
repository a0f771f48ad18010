use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT, VARY};
use http::{HeaderMap, StatusCode};
use std::cmp::Ordering;
use tracing::{debug, error, info, warn};

use super::{ResponseChain, ResponseStage};
use crate::dispatcher::MessageContext;
use crate::entity::{Outcome, ResponseEnvelope};
use crate::error::DispatchError;
use crate::media::{Accept, MediaType};
use crate::server::{EntityStream, ResponseSink};

/// Turns `ctx.error` into a response outcome through the exception mappers.
///
/// A mapper that fails degrades to a bare 500.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopulateErrorResponse;

impl ResponseStage for PopulateErrorResponse {
    fn name(&self) -> &'static str {
        "populate_error_response"
    }

    fn handle_response(
        &self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
        chain: ResponseChain<'_>,
    ) -> Result<(), DispatchError> {
        let Some(err) = ctx.error.clone() else {
            return chain.proceed(ctx, sink);
        };
        let envelope = match ctx.providers.map_error(&err) {
            Some(Ok(envelope)) => {
                debug!(error = %err, status = ?envelope.status, "Error mapped");
                envelope
            }
            Some(Err(mapper_err)) => {
                error!(error = %err, mapper_error = %mapper_err, "Exception mapper failed");
                ResponseEnvelope::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
            None => err.to_envelope(),
        };
        ctx.outcome = Some(Outcome::Response(envelope));
        ctx.status = None;
        ctx.response_media_type = None;
        ctx.response_headers.clear();
        chain.proceed(ctx, sink)
    }
}

/// Explicit status, else 204 without an entity, else 200.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopulateResponseStatus;

impl ResponseStage for PopulateResponseStatus {
    fn name(&self) -> &'static str {
        "populate_response_status"
    }

    fn handle_response(
        &self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
        chain: ResponseChain<'_>,
    ) -> Result<(), DispatchError> {
        let outcome = ctx.outcome.as_ref();
        let status = match outcome.and_then(Outcome::explicit_status) {
            Some(status) => status,
            None if outcome.and_then(Outcome::body).is_none() => StatusCode::NO_CONTENT,
            None => StatusCode::OK,
        };
        ctx.status = Some(status);
        chain.proceed(ctx, sink)
    }
}

/// Chooses the response `Content-Type`.
///
/// An explicit `Content-Type` header wins. Otherwise the method's produced
/// types (or, when it declares none, every type a writer can emit for the
/// entity) are intersected with the `Accept` header and the most specific
/// compatible type is taken, ties going to the higher quality. A wildcard
/// winner becomes `application/octet-stream` when the client accepts
/// anything. While rendering an error nothing is raised: the type is simply
/// left unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopulateResponseMediaType;

struct Candidate {
    media_type: MediaType,
    quality: f32,
}

impl PopulateResponseMediaType {
    fn negotiate(
        ctx: &MessageContext<'_>,
        accept: &Accept,
    ) -> Result<Option<MediaType>, DispatchError> {
        let Some(entity) = ctx.outcome.as_ref().and_then(Outcome::body) else {
            return Ok(None);
        };

        let declared: Vec<MediaType> = match ctx.search.method() {
            Some(found) if ctx.search.is_found() => found.metadata().produced().to_vec(),
            _ => Vec::new(),
        };
        let mut produced = if declared.is_empty() {
            ctx.providers
                .writer_media_types(entity.raw_type(), entity.generic_type())
        } else {
            declared
        };
        if produced.is_empty() {
            produced.push(MediaType::wildcard());
        }
        let (denied, _) = accept.partition();
        produced.retain(|media_type| !denied.iter().any(|d| d.covers(media_type)));

        let mut candidates: Vec<Candidate> = Vec::new();
        for acceptable in accept.media_types() {
            for media_type in &produced {
                if !media_type.is_compatible(acceptable) {
                    continue;
                }
                let chosen = if media_type.compare_specificity(acceptable) == Ordering::Greater {
                    media_type
                } else {
                    acceptable
                };
                let quality = acceptable.quality();
                if quality > 0.0 {
                    candidates.push(Candidate {
                        media_type: chosen.clone().without_param("q"),
                        quality,
                    });
                }
            }
        }

        let mut best: Option<&Candidate> = None;
        let mut use_octet_stream = false;
        for candidate in &candidates {
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    match candidate.media_type.compare_specificity(&current.media_type) {
                        Ordering::Greater => Some(candidate),
                        Ordering::Equal if candidate.quality > current.quality => Some(candidate),
                        _ => Some(current),
                    }
                }
            };
            let m = &candidate.media_type;
            if m.is_wildcard_type() || (m.type_() == "application" && m.is_wildcard_subtype()) {
                use_octet_stream = true;
            }
        }

        let chosen = match best {
            Some(best) if !best.media_type.is_wildcard_subtype() => best.media_type.clone(),
            Some(_) if use_octet_stream => MediaType::application_octet_stream(),
            _ => {
                if ctx.is_error_flow() {
                    debug!("No acceptable media type for the error entity; leaving it unset");
                    return Ok(None);
                }
                info!(
                    accept = ?accept.media_types(),
                    produced = ?produced,
                    "No acceptable response media type"
                );
                return Err(DispatchError::NotAcceptable);
            }
        };
        Ok(Some(chosen))
    }
}

impl ResponseStage for PopulateResponseMediaType {
    fn name(&self) -> &'static str {
        "populate_response_media_type"
    }

    fn handle_response(
        &self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
        chain: ResponseChain<'_>,
    ) -> Result<(), DispatchError> {
        let explicit = ctx
            .outcome
            .as_ref()
            .and_then(Outcome::explicit_headers)
            .and_then(|headers| headers.get(CONTENT_TYPE))
            .map(|value| {
                value
                    .to_str()
                    .ok()
                    .and_then(|text| MediaType::parse(text).ok())
                    .ok_or_else(|| {
                        DispatchError::internal("response Content-Type is not a media type")
                    })
            })
            .transpose()?;
        if let Some(media_type) = explicit {
            ctx.response_media_type = Some(media_type);
            return chain.proceed(ctx, sink);
        }

        let accept = ctx.request.accept().unwrap_or_else(|_| Accept::any());
        let Some(negotiated) = Self::negotiate(ctx, &accept)? else {
            return chain.proceed(ctx, sink);
        };

        let user_agent = ctx.request.header(USER_AGENT.as_str());
        let media_type = match ctx.config.map_media_type(user_agent, &negotiated) {
            Some(replacement) => {
                debug!(from = %negotiated, to = %replacement, "Media type mapped for client");
                replacement
            }
            None => negotiated,
        };

        let explicit_vary = ctx
            .outcome
            .as_ref()
            .and_then(Outcome::explicit_headers)
            .map_or(false, |headers| headers.contains_key(VARY));
        if ctx.config.add_vary_header && accept.is_significant() && !explicit_vary {
            ctx.response_headers
                .entry(VARY)
                .or_insert(HeaderValue::from_static("Accept"));
        }

        debug!(media_type = %media_type, "Response media type");
        ctx.response_media_type = Some(media_type);
        chain.proceed(ctx, sink)
    }
}

/// Writes status, headers and entity to the sink.
///
/// The entity goes through the first matching body writer, falling back to
/// the content handler registered for its media type; with neither the
/// request fails with a 500. An entity left without a media type (an error
/// no writer could render acceptably) goes out as `application/octet-stream`.
/// Nothing is written once the sink is committed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlushResult;

impl ResponseStage for FlushResult {
    fn name(&self) -> &'static str {
        "flush_result"
    }

    fn handle_response(
        &self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
        chain: ResponseChain<'_>,
    ) -> Result<(), DispatchError> {
        if sink.is_committed() {
            warn!("Response already committed; skipping flush");
            return chain.proceed(ctx, sink);
        }
        let status = ctx.status.unwrap_or(StatusCode::OK);
        sink.set_status(status);

        let mut headers = ctx
            .outcome
            .as_ref()
            .and_then(Outcome::explicit_headers)
            .cloned()
            .unwrap_or_default();
        merge_missing(&mut headers, &ctx.response_headers);

        let entity = ctx.outcome.as_ref().and_then(Outcome::body).cloned();
        let Some(entity) = entity else {
            EntityStream::new(sink, headers, ctx.discard_body)
                .finish()
                .map_err(|e| DispatchError::internal(format!("flushing headers: {}", e)))?;
            debug!(status = %status, "Flushed response without entity");
            return chain.proceed(ctx, sink);
        };

        let media_type = ctx.response_media_type.clone().unwrap_or_else(|| {
            debug!(
                entity_type = entity.raw_type().name(),
                "No negotiated media type; sending octets"
            );
            MediaType::application_octet_stream()
        });
        if let Ok(value) = HeaderValue::from_str(&media_type.to_string()) {
            headers.entry(CONTENT_TYPE).or_insert(value);
        }

        let written = if let Some(writer) =
            ctx.providers
                .writer(entity.raw_type(), entity.generic_type(), &media_type)
        {
            if let Some(size) = writer.size(&entity, &media_type) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
            }
            let mut stream = EntityStream::new(sink, headers, ctx.discard_body);
            writer
                .write_to(&entity, &media_type, &mut stream)
                .and_then(|()| stream.finish())
        } else if let Some(handler) = ctx.providers.content_handler(&media_type.essence()) {
            debug!(media_type = %media_type, "No writer; using content handler");
            let mut stream = EntityStream::new(sink, headers, ctx.discard_body);
            match handler.write(&entity, &mut stream) {
                Ok(true) => stream.finish(),
                Ok(false) => return Err(no_writer(&entity, &media_type)),
                Err(e) => Err(e),
            }
        } else {
            return Err(no_writer(&entity, &media_type));
        };

        let bytes = written.map_err(|e| DispatchError::internal(format!("writing entity: {}", e)))?;
        debug!(status = %status, media_type = %media_type, bytes, "Flushed response");
        chain.proceed(ctx, sink)
    }
}

fn no_writer(entity: &crate::entity::Entity, media_type: &MediaType) -> DispatchError {
    error!(
        entity_type = entity.raw_type().name(),
        media_type = %media_type,
        "No writer or content handler for response entity"
    );
    DispatchError::internal(format!(
        "no writer for {} as {}",
        entity.raw_type().name(),
        media_type
    ))
}

/// Copy headers from `extra` whose names are not already in `headers`.
fn merge_missing(headers: &mut HeaderMap, extra: &HeaderMap) {
    for name in extra.keys() {
        if headers.contains_key(name) {
            continue;
        }
        for value in extra.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
}
