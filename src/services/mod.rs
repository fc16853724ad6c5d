pub mod catalog;
pub mod pipeline;
pub mod resolver;

use std::sync::Arc;

use color_eyre::Result;

use crate::config::Config;
use crate::services::catalog::CatalogHttpAdapter;
use crate::services::pipeline::ResolutionPipeline;
use crate::services::resolver::ResolverHttpAdapter;
use crate::upstream::UpstreamHttp;

/// Wires the HTTP adapters described by `config` into a pipeline. Both adapters share one client.
pub fn pipeline_from_config(config: &Config) -> Result<ResolutionPipeline> {
    let http = UpstreamHttp::new(config.timeout()?)?;
    let catalog = CatalogHttpAdapter::new(http.clone(), &config.catalog)?;
    let resolver = ResolverHttpAdapter::new(http, &config.resolver, config.resolve_stage())?;

    Ok(ResolutionPipeline::new(
        config.normalizer(),
        Arc::new(catalog),
        config.selection_policy(),
        Arc::new(resolver),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_from_default_config() {
        assert!(pipeline_from_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_pipeline_from_config_rejects_bad_resolver_url() {
        let mut config = Config::default();
        config.resolver.base_url = "relative/path".to_string();
        assert!(pipeline_from_config(&config).is_err());
    }
}
