use color_eyre::Result;
use color_eyre::eyre::Context;
use serde_json::Value;
use url::Url;

use crate::config::ResolverConfig;
use crate::ports::resolver::{ResolveError, ResolverClient};
use crate::quality::Quality;
use crate::selection::CandidateId;
use crate::upstream::{Stage, UpstreamHttp};

/// Exchanges a catalog track id for a playable URL over HTTP.
pub struct ResolverHttpAdapter {
    http: UpstreamHttp,
    base_url: Url,
    stage: Stage,
    id_param: String,
    quality_param: String,
    envelope: Option<String>,
    url_field: String,
}

impl ResolverHttpAdapter {
    pub fn new(http: UpstreamHttp, config: &ResolverConfig, stage: Stage) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .wrap_err_with(|| format!("Invalid resolver base_url: {}", config.base_url))?;
        Ok(Self {
            http,
            base_url,
            stage,
            id_param: config.id_param.clone(),
            quality_param: config.quality_param.clone(),
            // an empty envelope in the config file means "top level only"
            envelope: config.envelope.clone().filter(|e| !e.is_empty()),
            url_field: config.url_field.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ResolverClient for ResolverHttpAdapter {
    async fn resolve(&self, id: &CandidateId, quality: Quality) -> Result<String, ResolveError> {
        let params = [
            (self.id_param.as_str(), id.to_string()),
            (self.quality_param.as_str(), quality.to_string()),
        ];
        let body = self
            .http
            .get_json(self.stage, self.base_url.clone(), &params)
            .await?;

        extract_url(&body, self.envelope.as_deref(), &self.url_field).ok_or_else(|| {
            ResolveError::MissingField {
                stage: self.stage,
                field: self.url_field.clone(),
            }
        })
    }

    fn stage(&self) -> Stage {
        self.stage
    }
}

/// Finds the playable URL in a resolver response.
///
/// Looks under `envelope` first, then at the top level. An array response is scanned for
/// the first element that carries the field.
pub fn extract_url(body: &Value, envelope: Option<&str>, field: &str) -> Option<String> {
    if let Value::Array(items) = body {
        return items
            .iter()
            .find_map(|item| extract_url(item, envelope, field));
    }

    envelope
        .and_then(|key| body.get(key))
        .and_then(|inner| non_empty_str(inner, field))
        .or_else(|| non_empty_str(body, field))
}

fn non_empty_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serve_upstream;
    use axum::{Json, Router, extract::RawQuery, routing::get};
    use serde_json::json;
    use std::time::Duration;

    // Answers with a URL only when called with exactly `track_id=42&quality=27`
    async fn download_upstream() -> ResolverHttpAdapter {
        let base = serve_upstream(Router::new().route(
            "/download-music",
            get(|RawQuery(query): RawQuery| async move {
                match query.as_deref() {
                    Some("track_id=42&quality=27") => {
                        Json(json!({ "success": true, "data": { "url": "https://cdn/42.flac" } }))
                    }
                    _ => Json(json!({ "success": true, "data": {} })),
                }
            }),
        ))
        .await;
        let config = ResolverConfig {
            base_url: base.join("download-music").unwrap().to_string(),
            ..ResolverConfig::default()
        };
        ResolverHttpAdapter::new(
            UpstreamHttp::new(Duration::from_secs(5)).unwrap(),
            &config,
            Stage::Download,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_sends_id_and_quality() {
        let adapter = download_upstream().await;

        let url = adapter
            .resolve(&CandidateId::Number(42), Quality::HiRes192)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/42.flac");
    }

    #[tokio::test]
    async fn test_resolve_without_url_is_missing_field() {
        let adapter = download_upstream().await;

        let err = adapter
            .resolve(&CandidateId::Number(7), Quality::HiRes192)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::MissingField {
                stage: Stage::Download,
                field: "url".to_string(),
            }
        );
    }

    #[test]
    fn test_url_under_envelope() {
        let body = json!({ "success": true, "data": { "url": "https://cdn/x.flac" } });
        assert_eq!(
            extract_url(&body, Some("data"), "url").as_deref(),
            Some("https://cdn/x.flac")
        );
    }

    #[test]
    fn test_url_at_top_level() {
        let body = json!({ "url": "https://cdn/top.flac" });
        assert_eq!(
            extract_url(&body, Some("data"), "url").as_deref(),
            Some("https://cdn/top.flac")
        );
        assert_eq!(
            extract_url(&body, None, "url").as_deref(),
            Some("https://cdn/top.flac")
        );
    }

    #[test]
    fn test_envelope_wins_over_top_level() {
        let body = json!({ "url": "https://cdn/top", "data": { "url": "https://cdn/inner" } });
        assert_eq!(
            extract_url(&body, Some("data"), "url").as_deref(),
            Some("https://cdn/inner")
        );
    }

    #[test]
    fn test_array_response() {
        let body = json!([
            { "OriginalTrackUrl": "" },
            { "OriginalTrackUrl": "https://cdn/second.flac" }
        ]);
        assert_eq!(
            extract_url(&body, None, "OriginalTrackUrl").as_deref(),
            Some("https://cdn/second.flac")
        );
    }

    #[test]
    fn test_missing_url() {
        assert_eq!(extract_url(&json!({ "data": {} }), Some("data"), "url"), None);
        assert_eq!(extract_url(&json!({ "data": { "url": 5 } }), Some("data"), "url"), None);
        assert_eq!(extract_url(&json!([]), None, "url"), None);
        assert_eq!(extract_url(&json!(null), None, "url"), None);
    }

    #[test]
    fn test_empty_envelope_config_is_top_level_only() {
        let config = ResolverConfig {
            envelope: Some(String::new()),
            ..ResolverConfig::default()
        };
        let http = UpstreamHttp::new(std::time::Duration::from_secs(1)).unwrap();
        let adapter = ResolverHttpAdapter::new(http, &config, Stage::Stream).unwrap();

        assert_eq!(adapter.envelope, None);
        assert_eq!(adapter.stage(), Stage::Stream);
    }
}
