use crate::config::ResponseField;
use crate::services::pipeline::ResolutionPipeline;

pub struct AppState {
    pub pipeline: ResolutionPipeline,
    pub response_field: ResponseField,
    pub expose_upstream_details: bool,
}
