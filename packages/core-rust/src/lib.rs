//! `reqscope` core — task-scoped request context, metadata, and request logging.
//!
//! An entry-point layer builds one [`RequestContext`] per inbound request and
//! binds it with [`scope::run`]. Code anywhere in that request's async chain
//! then reaches the request's state through the [`accessors`] without the
//! context being passed down explicitly.

pub mod accessors;
pub mod config;
pub mod context;
pub mod error;
pub mod handles;
pub mod id;
pub mod logger;
pub mod metadata;
pub mod scope;

pub use config::ContextConfig;
pub use context::RequestContext;
pub use error::ContextError;
pub use handles::{AppHandle, RequestHandle, ResponseHandle};
pub use logger::{Level, LogRecord, LogSink, LoggerFactory, MemorySink, RequestLogger, TracingSink};
pub use metadata::MetadataStore;

