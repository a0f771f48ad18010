use tracing::debug;

use crate::dispatcher::MessageContext;
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::metadata::{ContextKind, MethodMetadata, ParamDescriptor, ParamKind, ParamValue};
use crate::providers::ConversionError;
use crate::uri::decode;

/// Bind every formal parameter of `method`, in declaration order.
pub fn bind_parameters(
    method: &MethodMetadata,
    ctx: &MessageContext<'_>,
) -> Result<Vec<ParamValue>, DispatchError> {
    method
        .params()
        .iter()
        .map(|param| bind_parameter(param, ctx))
        .collect()
}

/// Extract, default, decode and convert one parameter.
///
/// Conversion failures are 404 for path, query and matrix parameters and
/// 400 for the rest. A converter returning
/// [`ConversionError::Response`] sends that response as is.
pub fn bind_parameter(
    param: &ParamDescriptor,
    ctx: &MessageContext<'_>,
) -> Result<ParamValue, DispatchError> {
    let request = &ctx.request;
    let decode_value = |v: String| if param.is_encoded() { v } else { decode(&v) };

    let mut values: Vec<String> = match param.kind() {
        ParamKind::Path { name } => ctx
            .search
            .data()
            .variable(name)
            .map(|v| decode_value(v.to_string()))
            .into_iter()
            .collect(),
        ParamKind::Query { name } => {
            if param.is_encoded() {
                request.query_param_encoded(name)
            } else {
                request.query_param(name)
            }
        }
        ParamKind::Matrix { name } => ctx
            .search
            .data()
            .last_matched_uri()
            .and_then(|segments| segments.last())
            .map(|segment| {
                segment
                    .matrix_param(name)
                    .map(|v| decode_value(v.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        ParamKind::Header { name } => request.header_values(name),
        ParamKind::Cookie { name } => request.cookies().remove(name).into_iter().collect(),
        ParamKind::Form { name } => request.form_param(name),
        ParamKind::Entity { target } => return read_entity(*target, ctx),
        ParamKind::Context(ContextKind::UriInfo) => {
            return Ok(ParamValue::UriInfo(ctx.search.uri_info(request)))
        }
        ParamKind::Context(ContextKind::Headers) => {
            return Ok(ParamValue::Headers(request.headers().clone()))
        }
    };

    if values.is_empty() {
        if let Some(default) = param.default_value() {
            values.push(default.to_string());
        }
    }

    let Some(converter) = param.converter() else {
        return Ok(ParamValue::Values(values));
    };
    match converter.convert(&values) {
        Ok(converted) => Ok(ParamValue::Converted(converted)),
        Err(ConversionError::Response(envelope)) => Err(DispatchError::Web(envelope)),
        Err(ConversionError::Invalid(reason)) => {
            debug!(param = ?param.kind(), %reason, "Parameter conversion failed");
            match param.kind() {
                ParamKind::Path { .. } | ParamKind::Query { .. } | ParamKind::Matrix { .. } => {
                    Err(DispatchError::NotFound)
                }
                _ => Err(DispatchError::bad_request(reason)),
            }
        }
    }
}

fn read_entity(
    target: crate::entity::TypeInfo,
    ctx: &MessageContext<'_>,
) -> Result<ParamValue, DispatchError> {
    let request = &ctx.request;
    let content_type = request.content_type()?;
    if request.body().is_empty() && content_type.is_none() {
        return Ok(ParamValue::Entity(None));
    }
    let media_type = content_type.unwrap_or_else(MediaType::application_octet_stream);
    let Some(reader) = ctx.providers.reader(target, &media_type) else {
        debug!(target = target.name(), media_type = %media_type, "No reader for request body");
        return Err(DispatchError::UnsupportedMediaType);
    };
    reader
        .read_from(target, &media_type, request.body())
        .map(|entity| ParamValue::Entity(Some(entity)))
}
