//! The per-request pipeline.
//!
//! A pipeline is an ordered list of named stages. Each stage receives the
//! request context and either hands it on to the next stage or ends the
//! request with a response. Errors end the request too and are rendered by
//! [`ApiError`].
//!
//! ```text
//!  request ──▶ [auth] ──▶ [proxy] ──▶ response
//!                │           │
//!                └── 401 ◀───┴── 404 / 502 / 504
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::context::RequestContext;
use crate::error::ApiError;

/// What a stage decided to do with a request.
#[derive(Debug)]
pub enum Flow {
    /// Pass the (possibly updated) context to the next stage.
    Continue(RequestContext),
    /// Stop here and send this response.
    Respond(Response),
}

/// One step of request handling.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Process the request.
    ///
    /// # Errors
    ///
    /// Returns an error to end the request with the corresponding error response.
    async fn run(&self, ctx: RequestContext) -> Result<Flow, ApiError>;
}

/// An ordered sequence of stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Create a pipeline that runs `stages` in order.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Names of the stages, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the request through every stage until one of them responds.
    pub async fn run(&self, mut ctx: RequestContext) -> Response {
        for stage in &self.stages {
            match stage.run(ctx).await {
                Ok(Flow::Continue(next)) => ctx = next,
                Ok(Flow::Respond(response)) => return response,
                Err(err) => {
                    tracing::debug!(stage = stage.name(), error = %err, "Request stopped");
                    return err.into_response();
                }
            }
        }

        ApiError::Internal(format!(
            "no stage responded to {} {}",
            ctx.method,
            ctx.path()
        ))
        .into_response()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::{HeaderMap, Method, StatusCode};

    use super::*;

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Stage for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn run(&self, ctx: RequestContext) -> Result<Flow, ApiError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Continue(ctx))
        }
    }

    struct Reply(StatusCode);

    #[async_trait]
    impl Stage for Reply {
        fn name(&self) -> &'static str {
            "reply"
        }

        async fn run(&self, _ctx: RequestContext) -> Result<Flow, ApiError> {
            Ok(Flow::Respond(self.0.into_response()))
        }
    }

    struct Reject;

    #[async_trait]
    impl Stage for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        async fn run(&self, _ctx: RequestContext) -> Result<Flow, ApiError> {
            Err(ApiError::Unauthorized)
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/api/orders/1".parse().unwrap(),
            HeaderMap::new(),
            Body::empty(),
        )
    }

    #[tokio::test]
    async fn stages_run_in_order_until_a_response() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(vec![
            Arc::new(Count(Arc::clone(&before))),
            Arc::new(Reply(StatusCode::ACCEPTED)),
            Arc::new(Count(Arc::clone(&after))),
        ]);

        let response = pipeline.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_short_circuits() {
        let after = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(vec![Arc::new(Reject), Arc::new(Count(Arc::clone(&after)))]);

        let response = pipeline.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falling_off_the_end_is_internal_error() {
        let pipeline = Pipeline::new(vec![Arc::new(Count(Arc::new(AtomicUsize::new(0))))]);

        let response = pipeline.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn stage_names_in_order() {
        let pipeline = Pipeline::new(vec![Arc::new(Reject), Arc::new(Reply(StatusCode::OK))]);
        assert_eq!(pipeline.stage_names(), vec!["reject", "reply"]);
    }
}
