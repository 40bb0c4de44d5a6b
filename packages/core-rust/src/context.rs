//! The per-request context object.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::ContextConfig;
use crate::handles::{AppHandle, RequestHandle, ResponseHandle};
use crate::logger::{LoggerFactory, RequestLogger};
use crate::metadata::MetadataStore;

/// State of one inbound request, shared through its whole execution chain.
///
/// A context is created once per request by the entry-point layer, wrapped
/// in an `Arc`, and bound with [`crate::scope::run`]. Identity, start time,
/// handles, configuration, and logger never change after construction;
/// metadata is the only mutable part (see [`MetadataStore`] for how it is
/// synchronised).
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    app: AppHandle,
    req: Arc<RequestHandle>,
    res: Arc<ResponseHandle>,
    config: Arc<ContextConfig>,
    logger: RequestLogger,
    start_time: Instant,
    metadata: MetadataStore,
}

impl RequestContext {
    /// Creates a context whose logger emits through `tracing`.
    #[must_use]
    pub fn new(
        app: AppHandle,
        req: Arc<RequestHandle>,
        res: Arc<ResponseHandle>,
        config: Arc<ContextConfig>,
        request_id: impl Into<String>,
    ) -> Self {
        Self::with_logger_factory(app, req, res, config, request_id, &LoggerFactory::default())
    }

    /// Creates a context whose logger is built by `loggers`.
    #[must_use]
    pub fn with_logger_factory(
        app: AppHandle,
        req: Arc<RequestHandle>,
        res: Arc<ResponseHandle>,
        config: Arc<ContextConfig>,
        request_id: impl Into<String>,
        loggers: &LoggerFactory,
    ) -> Self {
        let request_id = request_id.into();
        let logger = loggers.create(&request_id, &req);
        Self {
            request_id,
            app,
            req,
            res,
            config,
            logger,
            start_time: Instant::now(),
            metadata: MetadataStore::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[must_use]
    pub fn app(&self) -> &AppHandle {
        &self.app
    }

    #[must_use]
    pub fn req(&self) -> &Arc<RequestHandle> {
        &self.req
    }

    #[must_use]
    pub fn res(&self) -> &Arc<ResponseHandle> {
        &self.res
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ContextConfig> {
        &self.config
    }

    #[must_use]
    pub fn logger(&self) -> &RequestLogger {
        &self.logger
    }

    #[must_use]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Time since construction, measured on every call.
    #[must_use]
    pub fn elapsed_time(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.set(key, value);
    }

    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<Value> {
        self.metadata.get(key)
    }

    /// Typed view of a metadata entry; type safety is the caller's concern.
    #[must_use]
    pub fn get_metadata_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.metadata.get_as(key)
    }

    #[must_use]
    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains(key)
    }

    /// Removes an entry; returns whether it existed.
    pub fn delete_metadata(&self, key: &str) -> bool {
        self.metadata.remove(key)
    }

    /// Snapshot of all metadata. Mutating it does not affect the context.
    #[must_use]
    pub fn get_all_metadata(&self) -> Map<String, Value> {
        self.metadata.snapshot()
    }

    pub fn clear_metadata(&self) {
        self.metadata.clear();
    }
}
