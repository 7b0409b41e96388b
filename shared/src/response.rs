use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use crate::types::{ErrorBody, UserError};

/// Wrap `body` in the JSON envelope API Gateway expects.
pub fn api_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, Error> {
    let resp = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?;
    Ok(resp)
}

/// Render a failed operation as `{"error": "..."}` with its status class.
pub fn error_response(error: &UserError) -> Result<Response<Body>, Error> {
    // Storage failures are already logged by the store
    if let UserError::InternalServer(reason) = error {
        tracing::error!("Failed to map user record: {}", reason);
    }
    api_response(error.status_code(), &ErrorBody::from(error))
}
