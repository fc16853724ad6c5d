use crate::quality::Quality;
use crate::selection::CandidateId;
use crate::upstream::{Stage, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Upstream answered successfully but without the expected URL field
    #[error("{stage} response has no `{field}` field")]
    MissingField { stage: Stage, field: String },
}

/// Port trait for the upstream that turns a track id into a playable URL.
///
/// Implementations live in `services::resolver` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResolverClient: Send + Sync {
    async fn resolve(&self, id: &CandidateId, quality: Quality) -> Result<String, ResolveError>;

    /// Stage tag used for failures of this client
    fn stage(&self) -> Stage;
}
