//! Catch-all handler that feeds requests into the pipeline.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;

use crate::context::RequestContext;
use crate::pipeline::Pipeline;

/// Run every request not matched by another route through the pipeline.
pub async fn proxy(State(pipeline): State<Arc<Pipeline>>, request: Request) -> Response {
    pipeline.run(RequestContext::from_request(request)).await
}
