//! Input validation shared by the gateway and the resolver.

use axum::http::Method;

use crate::{
    error::PipelineError,
    model::{POSTAL_CODE_LEN, PostalCodeRequest},
};

/// Reject any method other than the one the endpoint serves.
pub fn check_method(method: &Method, allowed: &Method) -> Result<(), PipelineError> {
    if method == allowed {
        Ok(())
    } else {
        Err(PipelineError::MethodNotAllowed { allowed: allowed.clone() })
    }
}

/// Decode the body and enforce the postal code length.
///
/// Only the character count is checked; the content is passed on as-is.
pub fn decode_request(body: &[u8]) -> Result<PostalCodeRequest, PipelineError> {
    let request: PostalCodeRequest =
        serde_json::from_slice(body).map_err(|e| PipelineError::MalformedBody(e.to_string()))?;

    let length = request.code.chars().count();
    if length != POSTAL_CODE_LEN {
        return Err(PipelineError::InvalidPostalCode { length });
    }

    Ok(request)
}

/// Method first, then body; nothing leaves the process until both pass.
pub fn validate_request(
    method: &Method,
    allowed: &Method,
    body: &[u8],
) -> Result<PostalCodeRequest, PipelineError> {
    check_method(method, allowed)?;
    decode_request(body)
}
