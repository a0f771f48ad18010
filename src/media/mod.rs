//! # Media Type Module
//!
//! Media type parsing, `Accept` header ordering and the compatibility and
//! specificity rules shared by method selection and response negotiation.
//!
//! - [`MediaType::is_compatible`] is symmetric: wildcards on either side match.
//! - [`MediaType::covers`] is one-sided and is used when a `q=0` Accept entry
//!   excludes produced types.
//! - [`MediaType::compare_specificity`] orders `n/m > n/* > */*`.

mod accept;
mod media_type;

pub use accept::Accept;
pub use media_type::{MediaType, MediaTypeParseError};
