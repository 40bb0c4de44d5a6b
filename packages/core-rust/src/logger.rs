//! Request-bound logger and the factory that builds it.
//!
//! Every record a [`RequestLogger`] emits carries the standard fields
//! `timestamp`, `requestId`, `method`, `url`, and `ip`, captured when the
//! logger was created. A caller attachment is merged on top, so attachment
//! keys override the standard ones. Emission is synchronous: each call
//! hands exactly one [`LogRecord`] to the configured [`LogSink`].

use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::handles::RequestHandle;

/// `tracing` target used by [`TracingSink`].
pub const LOG_TARGET: &str = "reqscope::request";

/// Record field names.
pub mod fields {
    pub const TIMESTAMP: &str = "timestamp";
    pub const REQUEST_ID: &str = "requestId";
    pub const METHOD: &str = "method";
    pub const URL: &str = "url";
    pub const IP: &str = "ip";
    /// Holds a non-object attachment.
    pub const DATA: &str = "data";
}

/// Severity of a request log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Upper-case label used in the human-readable line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enriched log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    /// `[<timestamp>] [<LEVEL>] [<requestId>] <message>`
    pub line: String,
    /// Standard fields merged with the caller attachment.
    pub fields: Map<String, Value>,
}

/// Destination for request log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Emits each record as a `tracing` event at the matching level.
///
/// The event message is the human-readable line; the structured record is
/// attached as the `record` field (JSON) next to `request_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let request_id = record
            .fields
            .get(fields::REQUEST_ID)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let json = serde_json::to_string(&record.fields).unwrap_or_default();
        let line = record.line.as_str();

        match record.level {
            Level::Debug => {
                tracing::debug!(target: LOG_TARGET, request_id, record = %json, "{line}");
            }
            Level::Info => {
                tracing::info!(target: LOG_TARGET, request_id, record = %json, "{line}");
            }
            Level::Warn => {
                tracing::warn!(target: LOG_TARGET, request_id, record = %json, "{line}");
            }
            Level::Error => {
                tracing::error!(target: LOG_TARGET, request_id, record = %json, "{line}");
            }
        }
    }
}

/// Keeps every record in memory. Useful in tests and for embedding hosts
/// that ship records themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all records emitted so far, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

// ---------------------------------------------------------------------------
// LoggerFactory
// ---------------------------------------------------------------------------

/// Builds [`RequestLogger`]s that share one sink.
#[derive(Clone)]
pub struct LoggerFactory {
    sink: Arc<dyn LogSink>,
}

impl LoggerFactory {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Creates a logger bound to `request_id` and the request's method,
    /// URL, and client address.
    #[must_use]
    pub fn create(&self, request_id: &str, request: &RequestHandle) -> RequestLogger {
        RequestLogger {
            request_id: request_id.to_owned(),
            method: request.method().as_str().to_owned(),
            url: request.url().to_owned(),
            ip: request.client_ip(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for LoggerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerFactory").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RequestLogger
// ---------------------------------------------------------------------------

/// Leveled logger that enriches every record with its request's identity.
#[derive(Clone)]
pub struct RequestLogger {
    request_id: String,
    method: String,
    url: String,
    ip: String,
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message, None);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message, None);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message, None);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message, None);
    }

    pub fn debug_with(&self, message: &str, attachment: Value) {
        self.log(Level::Debug, message, Some(attachment));
    }

    pub fn info_with(&self, message: &str, attachment: Value) {
        self.log(Level::Info, message, Some(attachment));
    }

    pub fn warn_with(&self, message: &str, attachment: Value) {
        self.log(Level::Warn, message, Some(attachment));
    }

    pub fn error_with(&self, message: &str, attachment: Value) {
        self.log(Level::Error, message, Some(attachment));
    }

    /// Builds one record and hands it to the sink.
    pub fn log(&self, level: Level, message: &str, attachment: Option<Value>) {
        let record = self.record(level, message, attachment);
        self.sink.emit(&record);
    }

    /// Assembles the enriched record without emitting it.
    ///
    /// Object attachments are merged key by key, overriding standard fields
    /// on collision. Any other non-null attachment is stored under `data`.
    #[must_use]
    pub fn record(&self, level: Level, message: &str, attachment: Option<Value>) -> LogRecord {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{timestamp}] [{level}] [{}] {message}", self.request_id);

        let mut record = Map::new();
        record.insert(fields::TIMESTAMP.into(), Value::String(timestamp));
        record.insert(fields::REQUEST_ID.into(), Value::String(self.request_id.clone()));
        record.insert(fields::METHOD.into(), Value::String(self.method.clone()));
        record.insert(fields::URL.into(), Value::String(self.url.clone()));
        record.insert(fields::IP.into(), Value::String(self.ip.clone()));

        match attachment {
            Some(Value::Object(extra)) => record.extend(extra),
            None | Some(Value::Null) => {}
            Some(other) => {
                record.insert(fields::DATA.into(), other);
            }
        }

        LogRecord {
            level,
            message: message.to_owned(),
            line,
            fields: record,
        }
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("ip", &self.ip)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, Method, Uri};
    use serde_json::json;

    fn request() -> RequestHandle {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        RequestHandle::new(Method::POST, Uri::from_static("/orders?dry_run=1"), headers)
    }

    fn logger_with_sink() -> (RequestLogger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let factory = LoggerFactory::new(sink.clone());
        (factory.create("req-42", &request()), sink)
    }

    #[test]
    fn info_record_is_enriched_with_attachment() {
        let (logger, sink) = logger_with_sink();
        logger.info_with("hello", json!({"foo": 1}));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.level, Level::Info);
        assert_eq!(record.message, "hello");
        assert_eq!(record.fields["requestId"], "req-42");
        assert_eq!(record.fields["method"], "POST");
        assert_eq!(record.fields["url"], "/orders?dry_run=1");
        assert_eq!(record.fields["ip"], "203.0.113.9");
        assert_eq!(record.fields["foo"], 1);
        assert!(record.fields["timestamp"].is_string());
    }

    #[test]
    fn attachment_overrides_standard_keys() {
        let (logger, sink) = logger_with_sink();
        logger.warn_with("override", json!({"requestId": "x", "ip": "10.1.1.1"}));

        let record = &sink.records()[0];
        assert_eq!(record.fields["requestId"], "x");
        assert_eq!(record.fields["ip"], "10.1.1.1");
        assert_eq!(record.fields["method"], "POST");
    }

    #[test]
    fn line_format() {
        let (logger, _sink) = logger_with_sink();
        let record = logger.record(Level::Error, "boom", None);
        let timestamp = record.fields["timestamp"].as_str().unwrap();
        assert_eq!(record.line, format!("[{timestamp}] [ERROR] [req-42] boom"));
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn each_level_emits_once_with_matching_label() {
        let (logger, sink) = logger_with_sink();
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");

        let levels: Vec<_> = sink.records().iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![Level::Debug, Level::Info, Level::Warn, Level::Error]);
        assert!(sink.records()[2].line.contains("[WARN]"));
    }

    #[test]
    fn non_object_attachment_goes_under_data() {
        let (logger, _sink) = logger_with_sink();
        let record = logger.record(Level::Info, "m", Some(json!([1, 2, 3])));
        assert_eq!(record.fields["data"], json!([1, 2, 3]));

        let record = logger.record(Level::Info, "m", Some(Value::Null));
        assert!(!record.fields.contains_key("data"));
        assert_eq!(record.fields.len(), 5);
    }

    #[test]
    fn client_ip_unknown_without_sources() {
        let factory = LoggerFactory::new(Arc::new(MemorySink::new()));
        let req = RequestHandle::new(Method::GET, Uri::from_static("/"), HeaderMap::new());
        let logger = factory.create("r", &req);
        let record = logger.record(Level::Info, "m", None);
        assert_eq!(record.fields["ip"], crate::handles::UNKNOWN_IP);
    }

    #[test]
    fn tracing_sink_without_subscriber_is_silent() {
        let factory = LoggerFactory::default();
        let logger = factory.create("r", &request());
        logger.info_with("no subscriber installed", json!({"k": "v"}));
    }

    #[test]
    fn memory_sink_clear() {
        let (logger, sink) = logger_with_sink();
        logger.info("a");
        assert!(!sink.is_empty());
        sink.clear();
        assert_eq!(sink.len(), 0);
    }
}
