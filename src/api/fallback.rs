// Fallback for unknown routes

use axum::http::{StatusCode, Uri};

use crate::utils::response_handler::HandlerResponse;

pub async fn fallback_handler(uri: Uri) -> HandlerResponse {
    HandlerResponse::new(StatusCode::NOT_FOUND)
        .message(format!("No route for {}", uri.path()))
}
