//! Local relay failures and their JSON rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::ErrorBody;

/// Failures raised by the relay itself. Upstream error responses are not
/// represented here: they are relayed verbatim.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("API key not configured")]
    MissingCredential,

    #[error("Function error: {0}")]
    InvalidBody(String),

    #[error("Function error: {0}")]
    Transport(String),

    #[error("Function error: {0}")]
    UpstreamBody(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingCredential
            | RelayError::InvalidBody(_)
            | RelayError::Transport(_)
            | RelayError::UpstreamBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL so only the failure kind reaches the client
        RelayError::Transport(err.without_url().to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
