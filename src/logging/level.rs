//! Severity levels and the shared level register.
//!
//! # Design Decisions
//! - Names parse case-insensitively; display is always lowercase
//! - Empty text parses as `info`
//! - The register is an atomic byte, so readers never observe a torn value
//! - A failed `set` leaves the previous threshold in effect

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    /// Error that should abort in development builds of the embedding application.
    DPanic = 4,
    Panic = 5,
    Fatal = 6,
}

impl Level {
    /// All levels, lowest first.
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Lowercase name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    /// Closest `tracing` level. Everything above error collapses to ERROR.
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error | Level::DPanic | Level::Panic | Level::Fatal => tracing::Level::ERROR,
        }
    }

    fn from_u8(raw: u8) -> Self {
        Level::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Level::Info);
        }
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLevelError {
                input: s.to_string(),
            })
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, ParseLevelError> {
        value.parse()
    }
}

impl From<Level> for &'static str {
    fn from(level: Level) -> Self {
        level.as_str()
    }
}

/// An unrecognized severity name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized level: {input:?}")]
pub struct ParseLevelError {
    input: String,
}

impl ParseLevelError {
    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Process-wide, atomically updated severity threshold.
///
/// Clones share the same threshold. Intended to be set from flags or
/// configuration at startup and read on every log call.
#[derive(Debug, Clone)]
pub struct LevelRegister {
    level: Arc<AtomicU8>,
}

impl LevelRegister {
    /// Kind name shown in flag help output.
    pub const TYPE_NAME: &'static str = "level";

    /// Create a register holding `initial`.
    pub fn new(initial: Level) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(initial as u8)),
        }
    }

    /// Current threshold.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Acquire))
    }

    /// Replace the threshold.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Release);
    }

    /// Parse `value` as a level name and store it.
    pub fn set(&self, value: &str) -> Result<(), ParseLevelError> {
        let level = value.parse()?;
        self.set_level(level);
        Ok(())
    }

    /// Whether a record at `level` passes the threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Kind name for help text.
    pub fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl Default for LevelRegister {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl fmt::Display for LevelRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.level(), f)
    }
}
