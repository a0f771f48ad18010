use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::entity::ResponseEnvelope;

/// A converted parameter value.
pub type ConvertedValue = Arc<dyn Any + Send + Sync>;

/// Why a parameter value could not be converted.
#[derive(Debug, Clone)]
pub enum ConversionError {
    /// The raw value is malformed; the binder picks 400 or 404 by parameter kind.
    Invalid(String),
    /// Send exactly this response instead.
    Response(ResponseEnvelope),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Invalid(reason) => write!(f, "invalid parameter value: {}", reason),
            ConversionError::Response(envelope) => match envelope.status {
                Some(status) => write!(f, "conversion aborted with response {}", status),
                None => write!(f, "conversion aborted with response"),
            },
        }
    }
}

impl std::error::Error for ConversionError {}

/// Turns the raw string values of one parameter into a typed value.
///
/// Receives every value present (query and header parameters may repeat);
/// an absent parameter without a default arrives as an empty slice.
pub trait ParamConverter: Send + Sync {
    fn convert(&self, values: &[String]) -> Result<ConvertedValue, ConversionError>;
}

/// Converts the first value with `T::from_str`. An absent value yields
/// `Option::<T>::None`, a present one `Option::<T>::Some`.
pub struct FromStrConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FromStrConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ParamConverter for FromStrConverter<T>
where
    T: FromStr + Any + Send + Sync,
    T::Err: fmt::Display,
{
    fn convert(&self, values: &[String]) -> Result<ConvertedValue, ConversionError> {
        match values.first() {
            None => Ok(Arc::new(None::<T>)),
            Some(raw) => raw
                .parse::<T>()
                .map(|v| Arc::new(Some(v)) as ConvertedValue)
                .map_err(|e| ConversionError::Invalid(format!("{:?}: {}", raw, e))),
        }
    }
}

/// Adapts a closure into a [`ParamConverter`].
pub struct FnConverter<F>(pub F);

impl<F> ParamConverter for FnConverter<F>
where
    F: Fn(&[String]) -> Result<ConvertedValue, ConversionError> + Send + Sync,
{
    fn convert(&self, values: &[String]) -> Result<ConvertedValue, ConversionError> {
        (self.0)(values)
    }
}
