use axum::{
    Json,
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use crate::services::pipeline::{ErrorKind, ResolutionError};

/// A pipeline failure on its way out as a JSON error body
pub struct ApiError {
    pub error: ResolutionError,
    pub expose_details: bool,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamContractViolation => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response<Body> {
        let status = status_for(self.error.kind());
        if status.is_server_error() {
            tracing::error!(error = ?self.error, "Resolution failed");
        } else {
            tracing::debug!(error = %self.error, "Resolution rejected");
        }

        let body = match self.error.detail() {
            Some(detail) if self.expose_details => {
                json!({ "error": self.error.to_string(), "details": detail })
            }
            _ => json!({ "error": self.error.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::Stage;

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn unavailable() -> ResolutionError {
        ResolutionError::UpstreamUnavailable {
            stage: Stage::Search,
            detail: "search upstream returned status 502".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::UpstreamContractViolation),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::UpstreamUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_details_hidden_by_default() {
        let response = ApiError {
            error: unavailable(),
            expose_details: false,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "search upstream unavailable" })
        );
    }

    #[tokio::test]
    async fn test_details_exposed_when_enabled() {
        let response = ApiError {
            error: unavailable(),
            expose_details: true,
        }
        .into_response();

        assert_eq!(
            body_json(response).await,
            json!({
                "error": "search upstream unavailable",
                "details": "search upstream returned status 502"
            })
        );
    }
}
