use crate::error::{BatchOutcome, ErrorKind, LocalizationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// JSON envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        })
    }

    /// Batch results are delivered even when some entries failed; `success`
    /// is only false when nothing went through.
    pub fn batch(data: T, outcome: BatchOutcome) -> Json<Self> {
        Json(Self {
            success: outcome != BatchOutcome::Failed,
            data: Some(data),
            error: None,
            kind: None,
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// A `LocalizationError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub LocalizationError);

impl From<LocalizationError> for ApiError {
    fn from(err: LocalizationError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamProvider => StatusCode::BAD_GATEWAY,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let message = match kind {
            // Storage and file system details stay in the logs
            ErrorKind::Internal => {
                error!("Request failed: {}", self.0);
                "Internal server error".to_string()
            }
            _ => self.0.to_string(),
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            kind: Some(kind),
        };
        (status_for(kind), Json(body)).into_response()
    }
}
