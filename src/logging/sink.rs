//! Record sinks.
//!
//! # Responsibilities
//! - Define the record handed to a sink
//! - Forward records to `tracing` for the process subscriber
//! - Write records as JSON lines with one typed key per field
//! - Capture records in memory for tests and embedders
//!
//! # Design Decisions
//! - Level gating happens in the logger, before a sink sees a record
//! - Sinks are shared across handles and threads (`Send + Sync`)
//! - `TracingSink` renders fields into one `fields` string, since `tracing`
//!   field names are static; structured output goes through `JsonSink`

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::field::{DisplayFields, Field, Value};
use super::level::Level;

/// One log record as seen by a sink.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub level: Level,
    /// Dotted logger name, if any.
    pub name: Option<&'a str>,
    pub message: &'a str,
    /// Logger fields followed by call-site fields.
    pub fields: &'a [Field],
}

/// Destination for log records.
pub trait Sink: Send + Sync + 'static {
    fn emit(&self, record: &Record<'_>);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, record: &Record<'_>) {
        (**self).emit(record)
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSink;

impl Sink for NopSink {
    fn emit(&self, _record: &Record<'_>) {}
}

/// Forwards records to the global `tracing` dispatcher under the `ctxlog` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! emit_event {
    ($level:expr, $record:expr) => {
        tracing::event!(
            target: "ctxlog",
            $level,
            logger = $record.name.unwrap_or(""),
            fields = %DisplayFields($record.fields),
            "{}",
            $record.message
        )
    };
}

impl Sink for TracingSink {
    fn emit(&self, record: &Record<'_>) {
        // Everything above error maps to ERROR, matching `Level::as_tracing`.
        match record.level {
            Level::Debug => emit_event!(tracing::Level::DEBUG, record),
            Level::Info => emit_event!(tracing::Level::INFO, record),
            Level::Warn => emit_event!(tracing::Level::WARN, record),
            Level::Error | Level::DPanic | Level::Panic | Level::Fatal => {
                emit_event!(tracing::Level::ERROR, record)
            }
        }
    }
}

/// Writes one JSON object per record, one per line.
///
/// Keys are `level`, `ts` (seconds since the epoch), `logger` (when named) and
/// `msg`, followed by every field under its own key. Duplicate keys are
/// written in order.
#[derive(Clone)]
pub struct JsonSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl std::fmt::Debug for JsonSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSink").finish_non_exhaustive()
    }
}

struct JsonLine<'a> {
    ts: f64,
    record: &'a Record<'a>,
}

impl Serialize for JsonLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.record;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", record.level.as_str())?;
        map.serialize_entry("ts", &self.ts)?;
        if let Some(name) = record.name {
            map.serialize_entry("logger", name)?;
        }
        map.serialize_entry("msg", record.message)?;
        for field in record.fields {
            map.serialize_entry(field.key(), field.value())?;
        }
        map.end()
    }
}

impl Sink for JsonSink {
    fn emit(&self, record: &Record<'_>) {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();
        let mut line = match serde_json::to_vec(&JsonLine { ts, record }) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to encode log record");
                return;
            }
        };
        line.push(b'\n');

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = out.write_all(&line).and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "Failed to write log record");
        }
    }
}

/// Owned copy of a record held by [`CaptureSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRecord {
    pub level: Level,
    pub name: Option<String>,
    pub message: String,
    pub fields: Vec<Field>,
}

impl CapturedRecord {
    /// Last value recorded under `key`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.key() == key)
            .map(Field::value)
    }
}

/// Keeps every record in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured records, oldest first.
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for CaptureSink {
    fn emit(&self, record: &Record<'_>) {
        let captured = CapturedRecord {
            level: record.level,
            name: record.name.map(str::to_string),
            message: record.message.to_string(),
            fields: record.fields.to_vec(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
    }
}
