//! The event record (spec.md §3).
//!
//! Created once per log call, shallow-copied per pipeline before
//! transformation. Fields line up one-for-one with spec.md's list; the
//! Rust-specific additions (`transformer_error`/`presenter_error`) are the
//! marks §4.B's step executor leaves on a copy when a step fails.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::level::Level;

/// A caller-supplied context value. Small and closed-world on purpose —
/// spec.md's Non-goals exclude structured-event indexing, so this is not a
/// general JSON value, just enough to carry a handful of key/value pairs
/// through to a presenter.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// A string value.
    Str(String),
    /// A signed integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Str(s) => write!(f, "{}", s),
            ContextValue::Int(i) => write!(f, "{}", i),
            ContextValue::Float(v) => write!(f, "{}", v),
            ContextValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A context mapping attached to an event by the caller.
pub type Context = BTreeMap<String, ContextValue>;

/// A single positional formatting argument for [`crate::format::format_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    /// A string argument (`%s`).
    Str(String),
    /// An integer argument (`%d`).
    Int(i64),
    /// A floating point argument (`%f`).
    Float(f64),
}

impl fmt::Display for FormatArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatArg::Str(s) => write!(f, "{}", s),
            FormatArg::Int(i) => write!(f, "{}", i),
            FormatArg::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Where in the source a log call originated.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    /// The source file, as given by `file!()`.
    pub filename: &'static str,
    /// The source line, as given by `line!()`.
    pub lineno: u32,
}

/// The structured payload of a single log call.
///
/// Immutable from the caller's perspective; [`crate::pipeline::run_pipeline`]
/// makes a shallow copy (`clone()`) before running a pipeline's
/// transformers, so one failing transformer never corrupts the copy other
/// pipelines or other loggers see.
#[derive(Debug, Clone)]
pub struct Event {
    /// Numeric level of this event.
    pub level_no: Level,
    /// The level's name at the time the event was created.
    pub level_name: String,
    /// The raw message template, before formatting.
    pub message_fmt: String,
    /// Positional formatting arguments for `message_fmt`.
    pub args: Vec<FormatArg>,
    /// The formatted message. Set once during argument parsing; a
    /// presenter may read it but a transformer may also replace it.
    pub message: String,
    /// Caller-provided structured context, if any.
    pub context: Option<Context>,
    /// Wall-clock timestamp, captured at construction.
    pub timestamp: DateTime<Local>,
    /// The logger the call originated on.
    pub logger_name: Arc<str>,
    /// Copy of `logger_name`, preserved unchanged across propagation.
    pub source_logger_name: Arc<str>,
    /// The logger currently emitting this event during the propagation
    /// walk; `None` until the dispatch engine sets it per-pipeline.
    pub owner_logger_name: Option<Arc<str>>,
    /// The emitting logger's own (possibly `NOTSET`) level.
    pub owner_logger_level: Option<Level>,
    /// The emitting logger's `propagate` flag.
    pub owner_logger_propagate: Option<bool>,
    /// Source file of the log call, if known.
    pub filename: Option<&'static str>,
    /// Source line of the log call, if known.
    pub lineno: Option<u32>,
    /// Derived module identifier of the call site, if known.
    pub module: Option<String>,
    /// Set by the step executor when a transformer in the current
    /// pipeline's chain failed; cleared on every new pipeline copy.
    pub transformer_error: Option<String>,
    /// Set by the step executor when the presenter failed.
    pub presenter_error: Option<String>,
}

impl Event {
    /// Builds a new event record for `logger_name` at `level`, with the
    /// message already formatted by [`crate::format::build_message`].
    pub fn new(
        logger_name: Arc<str>,
        level: Level,
        message_fmt: String,
        args: Vec<FormatArg>,
        message: String,
        context: Option<Context>,
        call_site: Option<CallSite>,
        module: Option<String>,
    ) -> Event {
        Event {
            level_no: level,
            level_name: crate::level::name_of(level),
            message_fmt,
            args,
            message,
            context,
            timestamp: Local::now(),
            logger_name: logger_name.clone(),
            source_logger_name: logger_name,
            owner_logger_name: None,
            owner_logger_level: None,
            owner_logger_propagate: None,
            filename: call_site.map(|c| c.filename),
            lineno: call_site.map(|c| c.lineno),
            module,
            transformer_error: None,
            presenter_error: None,
        }
    }
}
