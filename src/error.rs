//! Crate-wide error type.
//!
//! Every named failure mode in the core's configuration and hierarchy error
//! taxonomy is a variant of [`GroveError`]. Runtime step failures (a
//! transformer, presenter, or output that errors) are isolated inside the
//! pipeline and never surface here — see [`crate::pipeline`]. Async writer
//! conditions (queue overflow, worker restarts, a stalled or timed-out
//! flush) are likewise not returned to the synchronous caller; they are
//! observable only through [`crate::async_writer::stats`], per spec.md §7.
//! Mirrors the one-`From`-impl-per-source convention fern uses for its own
//! small error enums.
use std::fmt;
use std::io;

/// All errors the public API can return.
#[derive(Debug)]
pub enum GroveError {
    /// A name was empty, non-ASCII-printable, or otherwise malformed.
    InvalidName(String),
    /// A custom level name collided with a built-in or an already
    /// registered level of a different value.
    LevelCollision {
        /// The level name that collided.
        name: String,
        /// The numeric value it was registered under.
        value: u8,
    },
    /// A custom level's numeric value fell outside `(0, 100)`.
    LevelOutOfRange(u8),
    /// A configuration map contained a key outside the recognized schema.
    UnknownKey {
        /// The offending key.
        key: String,
        /// The keys that would have been accepted.
        valid: &'static [&'static str],
    },
    /// A configuration value did not have the expected shape.
    InvalidType {
        /// The key whose value was malformed.
        key: &'static str,
        /// A short description of the expected shape.
        expected: &'static str,
    },
    /// A `level` value was not a valid, registered level.
    InvalidLevel(String),
    /// A logger name began with `_` but was not `_root`.
    ReservedName(String),
    /// A recognized but deprecated key was used.
    DeprecatedKey {
        /// The deprecated key.
        key: &'static str,
        /// Guidance for what to use instead.
        guidance: &'static str,
    },
    /// Underlying I/O failure (e.g. opening a file output).
    Io(io::Error),
}

impl fmt::Display for GroveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroveError::InvalidName(n) => write!(f, "invalid logger or level name: {:?}", n),
            GroveError::LevelCollision { name, value } => {
                write!(f, "level {:?} already registered with a different value (got {})", name, value)
            }
            GroveError::LevelOutOfRange(v) => write!(f, "level value {} is out of range (0, 100)", v),
            GroveError::UnknownKey { key, valid } => {
                write!(f, "unknown configuration key {:?}, valid keys are {:?}", key, valid)
            }
            GroveError::InvalidType { key, expected } => {
                write!(f, "configuration key {:?} expected {}", key, expected)
            }
            GroveError::InvalidLevel(v) => write!(f, "invalid level: {:?}", v),
            GroveError::ReservedName(n) => {
                write!(f, "logger name {:?} is reserved (only \"_root\" may begin with '_')", n)
            }
            GroveError::DeprecatedKey { key, guidance } => {
                write!(f, "configuration key {:?} is deprecated: {}", key, guidance)
            }
            GroveError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GroveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GroveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GroveError {
    fn from(e: io::Error) -> Self {
        GroveError::Io(e)
    }
}
