use http::{HeaderMap, StatusCode};

use super::search::SearchResult;
use crate::config::DispatchConfig;
use crate::entity::Outcome;
use crate::error::DispatchError;
use crate::media::MediaType;
use crate::providers::Providers;
use crate::registry::ResourceRegistry;
use crate::server::Request;

/// Per-request state passed through every pipeline stage.
///
/// Stages communicate only through this value; nothing request-scoped is
/// stored anywhere else.
pub struct MessageContext<'a> {
    /// Inbound request; the HEAD fallback rewrites its verb.
    pub request: Request,
    pub registry: &'a ResourceRegistry,
    pub providers: &'a Providers,
    pub config: &'a DispatchConfig,
    pub search: SearchResult,
    /// Result of invoking the method (or of mapping an error).
    pub outcome: Option<Outcome>,
    /// Status chosen by the response chain.
    pub status: Option<StatusCode>,
    /// Negotiated `Content-Type` of the response entity.
    pub response_media_type: Option<MediaType>,
    /// Extra headers stages want on the response.
    pub response_headers: HeaderMap,
    /// Error being rendered; set while the error chain runs.
    pub error: Option<DispatchError>,
    /// Count body bytes instead of sending them (HEAD served by GET).
    pub discard_body: bool,
}

impl<'a> MessageContext<'a> {
    #[must_use]
    pub fn new(
        request: Request,
        registry: &'a ResourceRegistry,
        providers: &'a Providers,
        config: &'a DispatchConfig,
    ) -> Self {
        Self {
            request,
            registry,
            providers,
            config,
            search: SearchResult::new(),
            outcome: None,
            status: None,
            response_media_type: None,
            response_headers: HeaderMap::new(),
            error: None,
            discard_body: false,
        }
    }

    /// True while the error chain is rendering a failure.
    #[must_use]
    pub fn is_error_flow(&self) -> bool {
        self.error.is_some()
    }

    /// Release every resource object matched for this request.
    pub fn release_resources(&self) {
        self.search.data.release_all(&self.request);
    }
}

impl std::fmt::Debug for MessageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("search", &self.search)
            .field("status", &self.status)
            .field("response_media_type", &self.response_media_type)
            .field("error", &self.error)
            .field("discard_body", &self.discard_body)
            .finish()
    }
}
