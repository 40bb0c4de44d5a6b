//! Ambient handles held by a [`crate::RequestContext`].
//!
//! The context holds these by `Arc` and never reassigns them. Their
//! contents belong to the surrounding request lifecycle: the host
//! framework owns the application object, the inbound request, and the
//! response that is eventually written.

use std::any::Any;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Response, StatusCode, Uri, Version};
use parking_lot::Mutex;

/// Client address reported when neither a forwarded header nor a peer
/// socket address is available.
pub const UNKNOWN_IP: &str = "unknown";

// ---------------------------------------------------------------------------
// AppHandle
// ---------------------------------------------------------------------------

/// Type-erased, cheaply cloneable reference to the host application object.
///
/// Callers recover the concrete type with [`AppHandle::downcast_ref`] or
/// [`AppHandle::downcast`].
#[derive(Clone)]
pub struct AppHandle(Arc<dyn Any + Send + Sync>);

impl AppHandle {
    /// Wraps an application value.
    pub fn new<T: Any + Send + Sync>(app: T) -> Self {
        Self(Arc::new(app))
    }

    /// Wraps an application value that is already shared.
    pub fn from_arc<T: Any + Send + Sync>(app: Arc<T>) -> Self {
        Self(app)
    }

    /// A handle to the unit value, used when no application object exists.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(())
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        (*self.0).is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    /// Returns a shared pointer to the application value if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }
}

impl Default for AppHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHandle").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RequestHandle
// ---------------------------------------------------------------------------

/// Read-only view of the inbound request that started the chain.
///
/// Holds the request line and headers, not the body: the body is consumed
/// by the handler and is not part of ambient state.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    trust_forwarded: bool,
}

impl RequestHandle {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers,
            remote_addr: None,
            trust_forwarded: true,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Records the transport-level peer address of the connection.
    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: Option<SocketAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    /// Whether [`Self::client_ip`] prefers proxy headers over the peer
    /// address. On by default; these headers are client-controlled unless a
    /// trusted proxy rewrites them.
    #[must_use]
    pub fn with_trusted_forwarding(mut self, trusted: bool) -> Self {
        self.trust_forwarded = trusted;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path and query string as originally requested (e.g. `/users?page=2`).
    #[must_use]
    pub fn url(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), http::uri::PathAndQuery::as_str)
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Client address as reported by a proxy: the first hop of
    /// `x-forwarded-for`, else `x-real-ip`.
    #[must_use]
    pub fn forwarded_ip(&self) -> Option<&str> {
        let first_hop = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        first_hop.or_else(|| {
            self.header("x-real-ip")
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
    }

    /// Best-known client address: forwarded address (when trusted), else
    /// the peer socket address, else [`UNKNOWN_IP`].
    #[must_use]
    pub fn client_ip(&self) -> String {
        self.forwarded_ip()
            .filter(|_| self.trust_forwarded)
            .map(str::to_owned)
            .or_else(|| self.remote_addr.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_IP.to_string())
    }
}

// ---------------------------------------------------------------------------
// ResponseHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StagedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
}

/// Staging area for the outgoing response.
///
/// Code anywhere in the chain may set a status or headers; the entry-point
/// layer applies them to the response produced by the handler via
/// [`ResponseHandle::apply`].
#[derive(Debug, Default)]
pub struct ResponseHandle {
    staged: Mutex<StagedResponse>,
}

impl ResponseHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any value previously staged under `name`.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.staged.lock().headers.insert(name, value);
    }

    /// Adds a header value without replacing earlier ones.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.staged.lock().headers.append(name, value);
    }

    /// Removes a staged header; returns whether one was staged.
    pub fn remove_header(&self, name: &HeaderName) -> bool {
        self.staged.lock().headers.remove(name).is_some()
    }

    /// Snapshot of the staged headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.staged.lock().headers.clone()
    }

    /// Overrides the status code of the final response.
    pub fn set_status(&self, status: StatusCode) {
        self.staged.lock().status = Some(status);
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.staged.lock().status
    }

    /// Writes the staged status and headers onto `response`.
    ///
    /// Staged headers replace same-named headers already on the response.
    pub fn apply<B>(&self, response: &mut Response<B>) {
        let staged = self.staged.lock();
        if let Some(status) = staged.status {
            *response.status_mut() = status;
        }
        for name in staged.headers.keys() {
            response.headers_mut().remove(name);
            for value in staged.headers.get_all(name) {
                response.headers_mut().append(name.clone(), value.clone());
            }
        }
    }
}
