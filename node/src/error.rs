use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Every error this node surfaces, wire-shaped to match the status codes and
/// plain-text bodies named in the HTTP surface table.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Key not found")]
    NotFound,

    #[error("{0}")]
    ProtocolMisuse(String),

    #[error("forward error: {0}")]
    Forwarding(String),

    #[error("Chord hop limit exceeded")]
    HopLimitExceeded,
}

impl ResponseError for NodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            NodeError::NotFound => StatusCode::NOT_FOUND,
            NodeError::ProtocolMisuse(_) => StatusCode::BAD_REQUEST,
            NodeError::Forwarding(_) => StatusCode::BAD_GATEWAY,
            NodeError::HopLimitExceeded => StatusCode::LOOP_DETECTED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain")
            .body(self.to_string())
    }
}
