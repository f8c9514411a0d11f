//! The public logger handle (spec.md §3, §4.C, §6).
//!
//! A cheap, cloneable reference into the hierarchy's arena. Mirrors the
//! ergonomics of `fern::Dispatch`'s builder methods, but these mutate a
//! cached, shared instance instead of consuming and rebuilding one.
use std::sync::Arc;

use crate::dispatch;
use crate::format::{build_message, LogInput};
use crate::level::Level;
use crate::record::CallSite;
use crate::registry::{self, LoggerConfig, LoggerState, ROOT_NAME};
use crate::pipeline::Pipeline;

/// A named node in the logger hierarchy.
///
/// Cloning a `Logger` is cheap (it clones an `Arc`) and always refers to
/// the same cached instance — per spec.md invariant 1, `logger(name)` is
/// identity-stable for the life of the process or until [`reset_cache`] is
/// called.
///
/// [`reset_cache`]: crate::reset_cache
#[derive(Clone)]
pub struct Logger {
    state: Arc<LoggerState>,
}

impl Logger {
    pub(crate) fn from_state(state: Arc<LoggerState>) -> Logger {
        Logger { state }
    }

    pub(crate) fn state(&self) -> Arc<LoggerState> {
        self.state.clone()
    }

    /// This logger's dotted name.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// `true` if this is the unique root logger.
    pub fn is_root(&self) -> bool {
        &*self.state.name == ROOT_NAME
    }

    /// This logger's own level, which may be `NOTSET`. See
    /// [`Logger::effective_level`] for the resolved, inherited level.
    pub fn level(&self) -> Level {
        *self.state.level.read().unwrap()
    }

    /// Sets this logger's own level. Takes effect on the next event
    /// (spec.md §4.C).
    pub fn set_level(&self, level: Level) {
        *self.state.level.write().unwrap() = level;
    }

    /// The level actually in force for this logger after walking up
    /// through any ancestors whose own level is `NOTSET` (spec.md §4.D).
    pub fn effective_level(&self) -> Level {
        dispatch::effective_level(&self.state)
    }

    /// Whether this logger propagates events to its parent after emitting
    /// its own pipelines.
    pub fn propagate(&self) -> bool {
        *self.state.propagate.read().unwrap()
    }

    /// Sets this logger's propagate flag.
    pub fn set_propagate(&self, value: bool) {
        *self.state.propagate.write().unwrap() = value;
    }

    /// Appends a pipeline to this logger's pipeline list (emit order is
    /// insertion order).
    pub fn add_pipeline(&self, pipeline: Pipeline) {
        self.state.pipelines.write().unwrap().push(pipeline);
    }

    /// Replaces this logger's entire pipeline list.
    pub fn set_pipelines(&self, pipelines: Vec<Pipeline>) {
        *self.state.pipelines.write().unwrap() = pipelines;
    }

    /// Returns a snapshot of this logger's current configuration.
    pub fn get_config(&self) -> LoggerConfig {
        LoggerConfig {
            level: Some(self.level()),
            propagate: Some(self.propagate()),
            pipelines: Some(self.state.pipelines.read().unwrap().clone()),
        }
    }

    /// Logs at `Level::DEBUG`.
    pub fn debug(&self, input: impl Into<LogInput>) {
        self.log(Level::DEBUG, input, None)
    }

    /// Logs at `Level::INFO`.
    pub fn info(&self, input: impl Into<LogInput>) {
        self.log(Level::INFO, input, None)
    }

    /// Logs at `Level::WARNING`.
    pub fn warn(&self, input: impl Into<LogInput>) {
        self.log(Level::WARNING, input, None)
    }

    /// Logs at `Level::ERROR`.
    pub fn error(&self, input: impl Into<LogInput>) {
        self.log(Level::ERROR, input, None)
    }

    /// Logs at `Level::CRITICAL`.
    pub fn critical(&self, input: impl Into<LogInput>) {
        self.log(Level::CRITICAL, input, None)
    }

    /// Logs at an arbitrary level, with an explicit call site. This is the
    /// method the `grove::log!`-style macros expand to; the plain
    /// `debug`/`info`/... methods call it with `call_site = None`.
    pub fn log_at(&self, level: Level, input: impl Into<LogInput>, call_site: Option<CallSite>) {
        self.log(level, input, call_site)
    }

    fn log(&self, level: Level, input: impl Into<LogInput>, call_site: Option<CallSite>) {
        crate::config::note_log_call();

        // Early exit optimization (spec.md §4.D): callers must not rely on
        // side-effecting argument expressions being evaluated only when
        // enabled, since Rust evaluates them before this method is called
        // regardless — this check only skips the (comparatively expensive)
        // message formatting and dispatch walk.
        if !crate::level::is_enabled(level, self.effective_level()) {
            return;
        }

        let built = build_message(input.into());
        let event = crate::record::Event::new(
            self.state.name.clone(),
            level,
            built.message_fmt,
            built.args,
            built.message,
            built.context,
            call_site,
            call_site.map(|cs| crate::callerinfo::derive_module_from_path(cs.filename)),
        );

        dispatch::dispatch(event, self.state.clone());
    }
}

/// Looks up or creates a logger by dotted name. If cached, the cached
/// instance is returned and `config` is ignored; otherwise it is created
/// with the given overrides, its parent chain resolved (and created if
/// necessary), and the result is cached.
pub fn logger(name: &str, config: Option<LoggerConfig>) -> Result<Logger, crate::error::GroveError> {
    registry::logger(name, config)
}

/// The automatic-name entry point `grove::logger!()` expands to: derives a
/// name from the caller's module path, falling back to `"anonymous"` if it
/// cannot be derived (spec.md §4.C).
#[doc(hidden)]
pub fn logger_for_module(module_path: &str) -> Logger {
    let name = if module_path.is_empty() { "anonymous" } else { module_path };
    let dotted = name.replace("::", ".");
    registry::logger(&dotted, None).unwrap_or_else(|_| registry::logger("anonymous", None).expect("anonymous is always a valid name"))
}
