//! Logger record & hierarchy (component C, spec.md §4.C).
//!
//! The arena that owns every logger by name; parent links are names
//! resolved back through the same arena, never `Arc` cycles, per spec.md
//! §9's design note. Grounded in `builders.rs::Dispatch`, generalized from
//! an anonymous nested-dispatch tree into a named, cached, looked-up tree.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::GroveError;
use crate::level::Level;
use crate::logger::Logger;
use crate::pipeline::Pipeline;

/// The reserved name of the unique root logger.
pub const ROOT_NAME: &str = "_root";

/// The materialized state of one logger in the hierarchy.
///
/// Owned by the registry's arena; referenced by [`Logger`] handles and by
/// other loggers' `parent` links (indirectly, through [`LoggerState::parent`]
/// which stores the parent's *name*, not an `Arc` to it).
pub struct LoggerState {
    pub(crate) name: Arc<str>,
    pub(crate) level: RwLock<Level>,
    pub(crate) parent: Option<Arc<str>>,
    pub(crate) pipelines: RwLock<Vec<Pipeline>>,
    pub(crate) propagate: RwLock<bool>,
}

impl LoggerState {
    fn new_root() -> Arc<LoggerState> {
        Arc::new(LoggerState {
            name: Arc::from(ROOT_NAME),
            level: RwLock::new(Level::WARNING),
            parent: None,
            pipelines: RwLock::new(Vec::new()),
            propagate: RwLock::new(true),
        })
    }

    fn new_child(name: Arc<str>, parent: Arc<str>, overrides: LoggerConfig) -> Arc<LoggerState> {
        Arc::new(LoggerState {
            name,
            level: RwLock::new(overrides.level.unwrap_or(Level::NOTSET)),
            parent: Some(parent),
            pipelines: RwLock::new(overrides.pipelines.unwrap_or_default()),
            propagate: RwLock::new(overrides.propagate.unwrap_or(true)),
        })
    }
}

/// Construction-time overrides accepted by [`logger`]. Unset fields fall
/// back to the defaults spec.md §3 specifies (`NOTSET` level, no
/// pipelines, `propagate = true`).
#[derive(Default, Clone)]
pub struct LoggerConfig {
    /// Initial level, if not `NOTSET`.
    pub level: Option<Level>,
    /// Initial pipelines.
    pub pipelines: Option<Vec<Pipeline>>,
    /// Initial propagate flag.
    pub propagate: Option<bool>,
}

struct Registry {
    loggers: HashMap<Arc<str>, Arc<LoggerState>>,
}

impl Registry {
    fn fresh() -> Self {
        let mut loggers = HashMap::new();
        loggers.insert(Arc::from(ROOT_NAME), LoggerState::new_root());
        Registry { loggers }
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::fresh()));

fn validate_name(name: &str) -> Result<(), GroveError> {
    if name.is_empty() {
        return Err(GroveError::InvalidName(name.to_string()));
    }
    if name.starts_with('_') && name != ROOT_NAME {
        return Err(GroveError::ReservedName(name.to_string()));
    }
    Ok(())
}

fn parent_name_of(name: &str) -> Arc<str> {
    match name.rfind('.') {
        Some(idx) => {
            let existing = REGISTRY.read().unwrap().loggers.get(&name[..idx]).map(|s| s.name.clone());
            existing.unwrap_or_else(|| Arc::from(&name[..idx]))
        }
        None => Arc::from(ROOT_NAME),
    }
}

/// Looks up or creates a logger by dotted name, recursively materializing
/// any missing ancestors. If the logger is already cached, the cached
/// instance is returned and `config` is ignored (spec.md §4.C).
pub fn logger(name: &str, config: Option<LoggerConfig>) -> Result<Logger, GroveError> {
    validate_name(name)?;
    let state = get_or_create(name, config.unwrap_or_default())?;
    Ok(Logger::from_state(state))
}

fn get_or_create(name: &str, config: LoggerConfig) -> Result<Arc<LoggerState>, GroveError> {
    if let Some(existing) = REGISTRY.read().unwrap().loggers.get(name) {
        return Ok(existing.clone());
    }

    if name == ROOT_NAME {
        // Always present; fresh() seeds it. Re-fetch in case of a race
        // with reset_cache() between the read above and here.
        return Ok(REGISTRY.read().unwrap().loggers.get(ROOT_NAME).expect("_root always exists").clone());
    }

    let parent_name = parent_name_of(name);
    let parent = get_or_create(&parent_name, LoggerConfig::default())?;

    let mut reg = REGISTRY.write().unwrap();
    // Another thread may have created it while we were recursing.
    if let Some(existing) = reg.loggers.get(name) {
        return Ok(existing.clone());
    }
    let state = LoggerState::new_child(Arc::from(name), parent.name.clone(), config);
    reg.loggers.insert(state.name.clone(), state.clone());
    Ok(state)
}

/// Looks up an already-cached logger by name without creating it. Used by
/// the dispatch walk to resolve parent links.
pub fn get_existing(name: &str) -> Option<Arc<LoggerState>> {
    REGISTRY.read().unwrap().loggers.get(name).cloned()
}

/// Drops every cached logger and re-materializes `_root` with defaults.
/// The next [`logger`] call rebuilds the tree from scratch.
pub fn reset_cache() {
    let mut reg = REGISTRY.write().unwrap();
    *reg = Registry::fresh();
}

/// Returns the number of currently cached loggers, root included.
/// Exposed for tests asserting cache behavior.
pub fn cache_len() -> usize {
    REGISTRY.read().unwrap().loggers.len()
}
