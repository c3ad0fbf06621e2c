//! Maps `CoreError` (and the HTTP layer's own failure modes) onto a conventional
//! HTTP status with a short textual body, per §7: "HTTP entry points that fail
//! before the stream starts return a conventional HTTP status with a short
//! textual body."

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use chatcore::{CoreError, StoreError};

pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let status = match &e {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
            CoreError::AttachmentNotReady(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::ToolExecError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::ApprovalTimeout => StatusCode::REQUEST_TIMEOUT,
            CoreError::ToolLoopLimit => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::from(CoreError::from(e))
    }
}

pub fn busy(conv_id: &str) -> ApiError {
    ApiError(
        StatusCode::CONFLICT,
        format!("conversation {conv_id} has a turn already in flight"),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, message.into())
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    ApiError(StatusCode::NOT_FOUND, message.into())
}
