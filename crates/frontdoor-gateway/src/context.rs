//! Per-request state passed between pipeline stages.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, Uri};

use frontdoor_auth::Claims;

/// Everything the pipeline knows about one inbound request.
///
/// Owned by the task handling the request and moved from stage to stage.
#[derive(Debug)]
pub struct RequestContext {
    /// The original method.
    pub method: Method,
    /// The original URI, path and query.
    pub uri: Uri,
    /// The original headers.
    pub headers: HeaderMap,
    /// The unread request body.
    pub body: Body,
    /// Set by the auth gate once a token has been verified.
    pub claims: Option<Claims>,
}

impl RequestContext {
    /// Create a context with no claims attached.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Body) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            claims: None,
        }
    }

    /// Take ownership of an inbound request.
    #[must_use]
    pub fn from_request(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    /// The request path, without the query.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Whether the path contains a `.` or `..` segment.
    #[must_use]
    pub fn has_dot_segment(&self) -> bool {
        has_dot_segment(self.path())
    }
}

/// Whether `path` contains a `.` or `..` segment, plain or percent-encoded.
///
/// The request line reaches the gateway unnormalized, while the outbound URL
/// parser resolves dot segments (and treats `\` as `/`). Such paths must not
/// be matched or forwarded as raw strings.
#[must_use]
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}
