//! Immutable logger handles.
//!
//! A [`Logger`] is a shared core (sink + level register) plus its own name and
//! fields. Adding a name or fields produces a new handle; the original keeps
//! emitting exactly what it did before.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::field::Field;
use super::level::{Level, LevelRegister};
use super::sink::{Record, Sink};

/// Process-wide fallback returned when a context holds no logger.
static NOP: Lazy<Logger> = Lazy::new(|| Logger {
    core: Arc::new(Core {
        sink: None,
        level: LevelRegister::new(Level::Fatal),
    }),
    name: None,
    fields: Arc::from(Vec::new()),
});

struct Core {
    /// `None` only for the no-op logger.
    sink: Option<Arc<dyn Sink>>,
    level: LevelRegister,
}

/// Construction options for [`Logger::new`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    level: Option<LevelRegister>,
    name: Option<String>,
    fields: Vec<Field>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate emission on a shared register. Defaults to a private `info` register.
    pub fn level(mut self, register: LevelRegister) -> Self {
        self.level = Some(register);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }
}

/// Structured logger handle.
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    name: Option<Arc<str>>,
    fields: Arc<[Field]>,
}

impl Logger {
    /// Build a logger writing to `sink`.
    pub fn new<S: Sink>(sink: S, options: Options) -> Self {
        let Options {
            level,
            name,
            fields,
        } = options;

        Self {
            core: Arc::new(Core {
                sink: Some(Arc::new(sink)),
                level: level.unwrap_or_default(),
            }),
            name: name.filter(|n| !n.is_empty()).map(Arc::from),
            fields: Arc::from(fields),
        }
    }

    /// The shared no-op logger. Every emit call on it is discarded.
    pub fn nop() -> &'static Logger {
        &NOP
    }

    pub fn is_nop(&self) -> bool {
        self.core.sink.is_none()
    }

    /// Dotted name, e.g. `server.request`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn level_register(&self) -> &LevelRegister {
        &self.core.level
    }

    /// New handle with `fields` appended after this handle's fields.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Logger {
        let mut merged = self.fields.to_vec();
        merged.extend(fields);
        if merged.len() == self.fields.len() {
            return self.clone();
        }

        Logger {
            core: Arc::clone(&self.core),
            name: self.name.clone(),
            fields: Arc::from(merged),
        }
    }

    /// New handle with `name` appended to this handle's name.
    pub fn named(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }

        let name = match &self.name {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.to_string(),
        };

        Logger {
            core: Arc::clone(&self.core),
            name: Some(Arc::from(name)),
            fields: Arc::clone(&self.fields),
        }
    }

    /// Whether a record at `level` would reach the sink.
    pub fn enabled(&self, level: Level) -> bool {
        self.core.sink.is_some() && self.core.level.enabled(level)
    }

    pub fn log(&self, level: Level, message: &str, fields: &[Field]) {
        let Some(sink) = &self.core.sink else {
            return;
        };
        if !self.core.level.enabled(level) {
            return;
        }

        let merged;
        let fields: &[Field] = if fields.is_empty() {
            &self.fields
        } else if self.fields.is_empty() {
            fields
        } else {
            merged = [&self.fields[..], fields].concat();
            &merged
        };

        sink.emit(&Record {
            level,
            name: self.name.as_deref(),
            message,
            fields,
        });
    }

    pub fn debug(&self, message: &str, fields: &[Field]) {
        self.log(Level::Debug, message, fields)
    }

    pub fn info(&self, message: &str, fields: &[Field]) {
        self.log(Level::Info, message, fields)
    }

    pub fn warn(&self, message: &str, fields: &[Field]) {
        self.log(Level::Warn, message, fields)
    }

    pub fn error(&self, message: &str, fields: &[Field]) {
        self.log(Level::Error, message, fields)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("level", &self.core.level.level())
            .field("nop", &self.is_nop())
            .finish()
    }
}
