use color_eyre::Result;
use color_eyre::eyre::Context;
use serde_json::Value;
use url::Url;

use crate::config::{CatalogConfig, TermPlacement};
use crate::ports::catalog::CatalogClient;
use crate::query::NormalizedTerm;
use crate::upstream::{Stage, TransportError, UpstreamHttp};

/// Catalog search over HTTP. Pagination is not supported: the offset is always 0.
pub struct CatalogHttpAdapter {
    http: UpstreamHttp,
    base_url: Url,
    placement: TermPlacement,
    query_param: String,
    offset_param: String,
}

impl CatalogHttpAdapter {
    pub fn new(http: UpstreamHttp, config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .wrap_err_with(|| format!("Invalid catalog base_url: {}", config.base_url))?;
        Ok(Self {
            http,
            base_url,
            placement: config.term_placement,
            query_param: config.query_param.clone(),
            offset_param: config.offset_param.clone(),
        })
    }

    fn request(&self, term: &NormalizedTerm) -> (Url, Vec<(&str, String)>) {
        let offset = (self.offset_param.as_str(), "0".to_string());
        match self.placement {
            TermPlacement::Query => (
                self.base_url.clone(),
                vec![(self.query_param.as_str(), term.to_string()), offset],
            ),
            TermPlacement::Path => {
                let mut url = self.base_url.clone();
                let path = format!(
                    "{}/{}",
                    url.path().trim_end_matches('/'),
                    term.as_path_segment()
                );
                url.set_path(&path);
                (url, vec![offset])
            }
        }
    }
}

#[async_trait::async_trait]
impl CatalogClient for CatalogHttpAdapter {
    async fn search(&self, term: &NormalizedTerm) -> Result<Value, TransportError> {
        let (url, params) = self.request(term);
        self.http.get_json(Stage::Search, url, &params).await
    }
}
