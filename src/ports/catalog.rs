use serde_json::Value;

use crate::query::NormalizedTerm;
use crate::upstream::TransportError;

/// Port trait for the upstream search service.
///
/// Implementations live in `services::catalog` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Raw decoded search response. The shape is upstream-defined and not validated here.
    async fn search(&self, term: &NormalizedTerm) -> Result<Value, TransportError>;
}
