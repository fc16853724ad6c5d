use std::sync::Arc;

use crate::ports::catalog::CatalogClient;
use crate::ports::resolver::{ResolveError, ResolverClient};
use crate::quality::Quality;
use crate::query::QueryNormalizer;
use crate::selection::{CandidateId, SelectionPolicy};
use crate::upstream::{Stage, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub url: String,
    pub track_id: CandidateId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    UpstreamUnavailable,
    NotFound,
    UpstreamContractViolation,
}

/// Terminal failure of a pipeline run. `message` is safe to show callers;
/// `detail` carries upstream text for logs and opt-in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("{stage} upstream unavailable")]
    UpstreamUnavailable { stage: Stage, detail: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{stage} upstream returned an unexpected response")]
    UpstreamContractViolation { stage: Stage, detail: String },
}

impl ResolutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::BadRequest { .. } => ErrorKind::BadRequest,
            ResolutionError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            ResolutionError::NotFound { .. } => ErrorKind::NotFound,
            ResolutionError::UpstreamContractViolation { .. } => {
                ErrorKind::UpstreamContractViolation
            }
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ResolutionError::UpstreamUnavailable { detail, .. }
            | ResolutionError::UpstreamContractViolation { detail, .. } => Some(detail),
            _ => None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ResolutionError::BadRequest {
            message: message.into(),
        }
    }
}

impl From<TransportError> for ResolutionError {
    fn from(err: TransportError) -> Self {
        ResolutionError::UpstreamUnavailable {
            stage: err.stage(),
            detail: err.to_string(),
        }
    }
}

impl From<ResolveError> for ResolutionError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Transport(err) => err.into(),
            ResolveError::MissingField { stage, .. } => {
                ResolutionError::UpstreamContractViolation {
                    stage,
                    detail: err.to_string(),
                }
            }
        }
    }
}

pub type ResolutionResult = Result<ResolvedTrack, ResolutionError>;

/// Query → catalog search → candidate selection → URL resolution.
///
/// Strictly sequential and single-attempt: the first failing stage ends the run.
pub struct ResolutionPipeline {
    normalizer: QueryNormalizer,
    catalog: Arc<dyn CatalogClient>,
    selection: SelectionPolicy,
    resolver: Arc<dyn ResolverClient>,
}

impl ResolutionPipeline {
    pub fn new(
        normalizer: QueryNormalizer,
        catalog: Arc<dyn CatalogClient>,
        selection: SelectionPolicy,
        resolver: Arc<dyn ResolverClient>,
    ) -> Self {
        Self {
            normalizer,
            catalog,
            selection,
            resolver,
        }
    }

    /// `quality` is the caller's raw value; `None` selects the default tier.
    #[tracing::instrument(skip(self), fields(policy = self.selection.name()))]
    pub async fn run(&self, raw_query: &str, quality: Option<&str>) -> ResolutionResult {
        let quality = Quality::from_request(quality)
            .map_err(|e| ResolutionError::bad_request(e.to_string()))?;

        let term = self.normalizer.normalize(raw_query);
        if term.is_empty() {
            return Err(ResolutionError::bad_request("Search query is required"));
        }
        tracing::debug!(%term, %quality, "Normalized query");

        let response = self.catalog.search(&term).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Catalog search failed");
        })?;

        let candidate =
            self.selection
                .select(&response)
                .ok_or_else(|| ResolutionError::NotFound {
                    message: format!("No matching track found for \"{term}\""),
                })?;
        tracing::info!(track_id = %candidate.id, marker = ?candidate.marker, "Selected candidate");

        let url = self
            .resolver
            .resolve(&candidate.id, quality)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    stage = %self.resolver.stage(),
                    track_id = %candidate.id,
                    error = %e,
                    "Resolve failed"
                );
            })?;

        tracing::info!(track_id = %candidate.id, "Resolved track URL");
        Ok(ResolvedTrack {
            url,
            track_id: candidate.id,
        })
    }
}
