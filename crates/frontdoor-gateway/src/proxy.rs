//! The proxy router.
//!
//! Last stage of the pipeline. Resolves the backend from the first path
//! segment after the global prefix, rewrites the path, and streams the
//! request to the backend and the backend's response back to the caller.
//!
//! The outbound call lives inside the request's future. If the client goes
//! away, the future is dropped together with the in-flight upstream request
//! (or the response body stream), which closes the upstream connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Method, StatusCode};
use axum::response::Response;
use futures::{future, stream, Stream, StreamExt, TryStreamExt};
use thiserror::Error;

use frontdoor_core::ServiceRegistry;

use crate::context::{has_dot_segment, RequestContext};
use crate::error::ApiError;
use crate::pipeline::{Flow, Stage};

/// Headers that apply to a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Routing failures.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No backend is registered under this name, or the path names no
    /// service at all (the path is carried instead).
    #[error("unknown service: {0:?}")]
    UnknownService(String),
}

/// Failures talking to a backend. Responses the backend does send, error
/// statuses included, are not failures.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The connection could not be established or broke before a response.
    #[error("upstream connection failed: {0}")]
    ConnectionRefused(String),

    /// No response headers within the configured timeout.
    #[error("upstream timed out")]
    Timeout,
}

/// Build the shared outbound HTTP client.
///
/// Redirects are relayed to the caller rather than followed.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Split a request path into the service name and the rest of the path.
///
/// `prefix` is the global prefix without slashes; it may be empty.
///
/// ```
/// use frontdoor_gateway::proxy::split_service_path;
///
/// assert_eq!(split_service_path("api", "/api/orders/42"), Some(("orders", "/42")));
/// assert_eq!(split_service_path("api", "/api/orders"), Some(("orders", "")));
/// assert_eq!(split_service_path("api", "/other/orders"), None);
/// ```
#[must_use]
pub fn split_service_path<'a>(prefix: &str, path: &'a str) -> Option<(&'a str, &'a str)> {
    let remainder = if prefix.is_empty() {
        path
    } else {
        let rest = path.strip_prefix('/')?.strip_prefix(prefix)?;
        if !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }
        rest
    };

    let remainder = remainder.strip_prefix('/')?;
    let (service, rest) = match remainder.find('/') {
        Some(idx) => remainder.split_at(idx),
        None => (remainder, ""),
    };

    if service.is_empty() {
        None
    } else {
        Some((service, rest))
    }
}

/// Build the outbound URL from the backend base URL, the rewritten path and
/// the original query.
#[must_use]
pub fn target_url(base_url: &str, rest: &str, query: Option<&str>) -> String {
    let path = if rest.is_empty() { "/" } else { rest };
    match query {
        Some(q) => format!("{base_url}{path}?{q}"),
        None => format!("{base_url}{path}"),
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Tracks one upstream call until its response body has been fully relayed.
///
/// Dropped unfinished means the caller went away, either while waiting for
/// the backend's headers or while the body was streaming. The abort is
/// logged and counted.
struct InFlight {
    service: String,
    target: String,
    started: Instant,
    phase: &'static str,
    aborted: Arc<AtomicU64>,
    done: bool,
}

impl InFlight {
    fn new(service: &str, target: &str, aborted: Arc<AtomicU64>) -> Self {
        Self {
            service: service.to_string(),
            target: target.to_string(),
            started: Instant::now(),
            phase: "awaiting response",
            aborted,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.done {
            self.aborted.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                service = %self.service,
                target = %self.target,
                phase = self.phase,
                elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Client went away, upstream call aborted"
            );
        }
    }
}

/// Relay `upstream` as a response body that keeps `in_flight` alive until
/// the last chunk.
fn guarded_body<S>(upstream: S, mut in_flight: InFlight) -> Body
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    in_flight.phase = "streaming body";
    let service = in_flight.service.clone();

    let upstream = upstream.inspect_err(move |e| {
        tracing::warn!(service = %service, error = %e, "Upstream body stream failed");
    });
    let end = stream::once(async move { in_flight.finish() })
        .filter_map(|()| future::ready(None::<reqwest::Result<Bytes>>));

    Body::from_stream(upstream.chain(end))
}

/// Pipeline stage that forwards requests to their backend.
pub struct ProxyRouter {
    registry: Arc<ServiceRegistry>,
    client: reqwest::Client,
    global_prefix: String,
    upstream_timeout: Duration,
    aborted: Arc<AtomicU64>,
}

impl ProxyRouter {
    /// Create a router over `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry>,
        client: reqwest::Client,
        global_prefix: &str,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            global_prefix: global_prefix.trim_matches('/').to_string(),
            upstream_timeout,
            aborted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of upstream calls abandoned because the caller went away.
    #[must_use]
    pub fn aborted_calls(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Resolve the outbound URL for a request.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownService`] if the path names no
    /// registered service or contains a `.` or `..` segment.
    pub fn route(&self, path: &str, query: Option<&str>) -> Result<(String, String), RoutingError> {
        if has_dot_segment(path) {
            return Err(RoutingError::UnknownService(path.to_string()));
        }
        let (service, rest) = split_service_path(&self.global_prefix, path)
            .ok_or_else(|| RoutingError::UnknownService(path.to_string()))?;
        let base_url = self
            .registry
            .resolve(service)
            .ok_or_else(|| RoutingError::UnknownService(service.to_string()))?;
        Ok((service.to_string(), target_url(base_url, rest, query)))
    }

    /// Send the request to `target` and turn the backend's answer into a
    /// streamed response.
    async fn forward(
        &self,
        service: &str,
        target: &str,
        ctx: RequestContext,
    ) -> Result<Response, UpstreamError> {
        let RequestContext {
            method,
            mut headers,
            body,
            ..
        } = ctx;

        headers.remove(header::HOST);
        strip_hop_by_hop(&mut headers);
        let is_head = method == Method::HEAD;

        let mut request = self.client.request(method, target).headers(headers);
        if !body.is_end_stream() {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let mut in_flight = InFlight::new(service, target, Arc::clone(&self.aborted));
        let outcome = tokio::time::timeout(self.upstream_timeout, request.send()).await;

        let upstream = match outcome {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => {
                in_flight.finish();
                return Err(if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::ConnectionRefused(e.to_string())
                });
            }
            Err(_) => {
                in_flight.finish();
                return Err(UpstreamError::Timeout);
            }
        };

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        // The server never polls a body it is not allowed to send.
        let bodyless = is_head
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || upstream.content_length() == Some(0);
        let body = if bodyless {
            in_flight.finish();
            Body::empty()
        } else {
            guarded_body(upstream.bytes_stream(), in_flight)
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
impl Stage for ProxyRouter {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn run(&self, ctx: RequestContext) -> Result<Flow, ApiError> {
        let (service, target) = self.route(ctx.path(), ctx.query())?;
        let subject = ctx.claims.as_ref().map(|c| c.subject.clone());

        tracing::debug!(
            service = %service,
            target = %target,
            method = %ctx.method,
            subject = ?subject,
            "Forwarding request"
        );

        match self.forward(&service, &target, ctx).await {
            Ok(response) => {
                tracing::debug!(service = %service, status = %response.status(), "Upstream responded");
                Ok(Flow::Respond(response))
            }
            Err(err) => {
                tracing::warn!(service = %service, target = %target, error = %err, "Upstream unavailable");
                Err(err.into())
            }
        }
    }
}
