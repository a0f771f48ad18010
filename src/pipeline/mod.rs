//! # Pipeline Module
//!
//! Ordered request and response stages that take a [`MessageContext`]
//! from search to a flushed response.
//!
//! ## Chains
//!
//! | Chain | Stages |
//! |-------|--------|
//! | request | [`SearchResultCheck`] → [`HeadFallback`] → [`FindResource`] → [`CreateInvocationParameters`] → *user* → [`InvokeMethod`] |
//! | response | [`PopulateResponseStatus`] → [`PopulateResponseMediaType`] → *user* → [`FlushResult`] |
//! | error | [`PopulateErrorResponse`] → [`PopulateResponseStatus`] → [`PopulateResponseMediaType`] → *user* → [`FlushResult`] |
//!
//! Every stage receives the rest of its chain and decides whether and when
//! to continue it, so a stage can act both before and after the stages
//! that follow it. [`SearchResultCheck`] runs the search first and only
//! then turns a failed search into an error; [`HeadFallback`] re-runs the
//! rest of the chain as GET when a HEAD request found no method.
//!
//! [`RequestProcessor`] runs the request chain and then the response chain.
//! Any `Err` switches to the error chain. Matched resource objects are
//! released once the response is written, whichever chain wrote it.

mod binding;
mod processor;
mod request;
mod response;
mod tracing;

use std::sync::Arc;

use crate::dispatcher::MessageContext;
use crate::error::DispatchError;
use crate::server::ResponseSink;

pub use self::tracing::TracingStage;
pub use binding::{bind_parameter, bind_parameters};
pub use processor::RequestProcessor;
pub use request::{
    CreateInvocationParameters, FindResource, HeadFallback, InvokeMethod, SearchResultCheck,
};
pub use response::{
    FlushResult, PopulateErrorResponse, PopulateResponseMediaType, PopulateResponseStatus,
};

/// A step of the request chain.
pub trait RequestStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Do this stage's work, calling `chain.proceed(ctx)` to run the rest.
    fn handle_request(
        &self,
        ctx: &mut MessageContext<'_>,
        chain: RequestChain<'_>,
    ) -> Result<(), DispatchError>;
}

/// A step of the response or error chain.
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle_response(
        &self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
        chain: ResponseChain<'_>,
    ) -> Result<(), DispatchError>;
}

/// The request stages that have not run yet.
#[derive(Clone, Copy)]
pub struct RequestChain<'s> {
    stages: &'s [Arc<dyn RequestStage>],
}

impl<'s> RequestChain<'s> {
    #[must_use]
    pub fn new(stages: &'s [Arc<dyn RequestStage>]) -> Self {
        Self { stages }
    }

    /// Run the next stage, which in turn runs the ones after it.
    pub fn proceed(self, ctx: &mut MessageContext<'_>) -> Result<(), DispatchError> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle_request(ctx, RequestChain { stages: rest }),
            None => Ok(()),
        }
    }
}

/// The response stages that have not run yet.
#[derive(Clone, Copy)]
pub struct ResponseChain<'s> {
    stages: &'s [Arc<dyn ResponseStage>],
}

impl<'s> ResponseChain<'s> {
    #[must_use]
    pub fn new(stages: &'s [Arc<dyn ResponseStage>]) -> Self {
        Self { stages }
    }

    pub fn proceed(
        self,
        ctx: &mut MessageContext<'_>,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), DispatchError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage.handle_response(ctx, sink, ResponseChain { stages: rest })
            }
            None => Ok(()),
        }
    }
}
