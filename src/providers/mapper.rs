use crate::entity::ResponseEnvelope;
use crate::error::DispatchError;

/// Substitutes a custom response for a dispatch error.
///
/// Returning `None` declines the error so the next mapper (or the error's
/// default response) applies. A mapper that itself fails returns
/// `Some(Err(..))`; the processor degrades that to a plain 500.
pub trait ExceptionMapper: Send + Sync {
    fn to_response(&self, error: &DispatchError) -> Option<Result<ResponseEnvelope, DispatchError>>;
}

/// Adapts a closure into an [`ExceptionMapper`].
pub struct FnMapper<F>(pub F);

impl<F> ExceptionMapper for FnMapper<F>
where
    F: Fn(&DispatchError) -> Option<Result<ResponseEnvelope, DispatchError>> + Send + Sync,
{
    fn to_response(
        &self,
        error: &DispatchError,
    ) -> Option<Result<ResponseEnvelope, DispatchError>> {
        (self.0)(error)
    }
}
