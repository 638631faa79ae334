// Global error handling for HTTP middleware layers

use std::error::Error;

use axum::{http::StatusCode, BoxError};
// Axum uses http_body_util for length-limiting
use http_body_util::LengthLimitError;
// tower's error type for timeouts
use tower::timeout::error::Elapsed;
use tracing::warn;

use crate::utils::response_handler::HandlerResponse;

/// Maps errors raised by the middleware stack to enveloped HTTP responses
pub async fn handle_global_error(err: BoxError) -> HandlerResponse {
    // 413 if the body was too large
    if find_cause::<LengthLimitError>(&*err).is_some() {
        return HandlerResponse::new(StatusCode::PAYLOAD_TOO_LARGE)
            .message("Request body too large");
    }

    // 408 if the request took too long
    if err.is::<Elapsed>() {
        return HandlerResponse::new(StatusCode::REQUEST_TIMEOUT)
            .message("Request timed out");
    }

    // Otherwise, 500
    warn!("Unhandled middleware error: {}", err);
    HandlerResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
        .message("Internal server error")
}

/// Helper function to find specific error type in error chain
pub fn find_cause<'a, T: Error + 'static>(err: &'a (dyn Error + 'static)) -> Option<&'a T> {
    let mut source: Option<&'a (dyn Error + 'static)> = Some(err);

    while let Some(s) = source {
        if let Some(typed) = s.downcast_ref::<T>() {
            return Some(typed);
        }
        source = s.source();
    }

    None
}
