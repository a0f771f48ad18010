//! # Server Module
//!
//! Transport-neutral request and response types.
//!
//! The dispatch engine does not own sockets. A transport adapter converts its
//! inbound request into a [`Request`] and supplies a [`ResponseSink`];
//! [`BufferedResponse`] is the in-memory sink that converts back into an
//! `http::Response`. Body writers receive an [`EntityStream`], which defers
//! sending headers until the first body byte.

mod request;
mod response;

pub use request::{parse_cookies, parse_query_params, Request};
pub use response::{BufferedResponse, EntityStream, ResponseSink};
