use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Which outbound call a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Download,
    Stream,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Search => "search",
            Stage::Download => "download",
            Stage::Stream => "stream",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{stage} request failed: {detail}")]
    Request { stage: Stage, detail: String },
    #[error("{stage} request timed out")]
    Timeout { stage: Stage },
    #[error("{stage} upstream returned status {status}")]
    Status { stage: Stage, status: u16 },
    #[error("{stage} upstream returned an undecodable body: {detail}")]
    Decode { stage: Stage, detail: String },
}

impl TransportError {
    pub fn stage(&self) -> Stage {
        match self {
            TransportError::Request { stage, .. }
            | TransportError::Timeout { stage }
            | TransportError::Status { stage, .. }
            | TransportError::Decode { stage, .. } => *stage,
        }
    }

    fn from_reqwest(stage: Stage, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { stage }
        } else if let Some(status) = err.status() {
            TransportError::Status {
                stage,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                stage,
                detail: err.without_url().to_string(),
            }
        } else {
            TransportError::Request {
                stage,
                detail: err.without_url().to_string(),
            }
        }
    }
}

/// Shared outbound HTTP client. Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamHttp {
    client: Client,
}

impl UpstreamHttp {
    pub fn new(timeout: Duration) -> color_eyre::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Single GET, no retries. Any failure (network, non-2xx, bad JSON) is a `TransportError`.
    pub async fn get_json(
        &self,
        stage: Stage,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        tracing::debug!(%stage, %url, "Sending upstream request");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| TransportError::from_reqwest(stage, e))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::from_reqwest(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serve_upstream;
    use axum::{Json, Router, http::StatusCode, response::Html, routing::get};
    use serde_json::json;

    async fn upstream() -> Url {
        serve_upstream(
            Router::new()
                .route("/ok", get(|| async { Json(json!({ "tracks": [] })) }))
                .route(
                    "/bad-gateway",
                    get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
                )
                .route("/html", get(|| async { Html("<html>blocked</html>") }))
                .route(
                    "/slow",
                    get(|| async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Json(json!({}))
                    }),
                ),
        )
        .await
    }

    #[tokio::test]
    async fn test_json_body_is_returned() {
        let base = upstream().await;
        let http = UpstreamHttp::new(Duration::from_secs(5)).unwrap();

        let body = http
            .get_json(Stage::Search, base.join("ok").unwrap(), &[])
            .await
            .unwrap();

        assert_eq!(body, json!({ "tracks": [] }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_classified() {
        let base = upstream().await;
        let http = UpstreamHttp::new(Duration::from_secs(5)).unwrap();

        let err = http
            .get_json(Stage::Search, base.join("bad-gateway").unwrap(), &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransportError::Status {
                stage: Stage::Search,
                status: 502
            }
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error_without_url() {
        let base = upstream().await;
        let http = UpstreamHttp::new(Duration::from_secs(5)).unwrap();

        let err = http
            .get_json(
                Stage::Download,
                base.join("html").unwrap(),
                &[("q", "secret term".to_string())],
            )
            .await
            .unwrap_err();

        match err {
            TransportError::Decode { stage, detail } => {
                assert_eq!(stage, Stage::Download);
                assert!(!detail.contains("secret"), "detail leaks the url: {detail}");
                assert!(!detail.contains("127.0.0.1"), "detail leaks the url: {detail}");
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let base = upstream().await;
        let http = UpstreamHttp::new(Duration::from_millis(200)).unwrap();

        let err = http
            .get_json(Stage::Stream, base.join("slow").unwrap(), &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransportError::Timeout {
                stage: Stage::Stream
            }
        );
    }

    #[test]
    fn test_transport_error_messages_name_the_stage() {
        let err = TransportError::Status {
            stage: Stage::Search,
            status: 502,
        };
        assert_eq!(err.to_string(), "search upstream returned status 502");
        assert_eq!(err.stage(), Stage::Search);

        let err = TransportError::Timeout {
            stage: Stage::Stream,
        };
        assert_eq!(err.to_string(), "stream request timed out");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_request_error() {
        let http = UpstreamHttp::new(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is essentially never listening
        let url = Url::parse("http://127.0.0.1:9/get-music").unwrap();

        let err = http
            .get_json(Stage::Search, url, &[("q", "x".to_string())])
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Search);
        assert!(matches!(
            err,
            TransportError::Request { .. } | TransportError::Timeout { .. }
        ));
    }
}
