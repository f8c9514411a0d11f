//! Root configuration (component F, spec.md §4.F, §6).
//!
//! The single mutable process-wide state the root logger is materialized
//! from. Grounded in `builders.rs::Dispatch::into_dispatch`/`set_global`
//! (single point of finalization), generalized from "consumed once into a
//! global logger" to "re-enterable, validated, atomic-per-key
//! reconfiguration".
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::async_writer::OverflowStrategy;
use crate::error::GroveError;
use crate::level::Level;
use crate::pipeline::Pipeline;
use crate::registry::{self, ROOT_NAME};

/// Async-writer sub-configuration (spec.md §4.E, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncConfig {
    /// Whether the async writer is enabled at all.
    pub enabled: bool,
    /// Maximum number of events drained per worker pass.
    pub batch_size: usize,
    /// How often the worker drains a non-empty, sub-batch-size queue.
    pub flush_interval: Duration,
    /// Maximum number of events the queue can hold.
    pub max_queue_size: usize,
    /// What to do when the queue is full.
    pub overflow_strategy: OverflowStrategy,
    /// Maximum number of worker restarts for the lifetime of the process.
    pub max_restarts: u32,
    /// Minimum time between two restart attempts.
    pub restart_backoff: Duration,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        AsyncConfig {
            enabled: false,
            batch_size: 50,
            flush_interval: Duration::from_secs_f64(1.0),
            max_queue_size: 10_000,
            overflow_strategy: OverflowStrategy::DropOldest,
            max_restarts: 5,
            restart_backoff: Duration::from_secs_f64(1.0),
        }
    }
}

/// Live-level poller sub-configuration (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct LiveLevelConfig {
    /// The environment variable to poll.
    pub env_var: Option<String>,
    /// How many log calls between polls.
    pub check_interval: u64,
    /// Whether polling is active. Defaults to `true` iff `env_var` is set.
    pub enabled: bool,
}

impl Default for LiveLevelConfig {
    fn default() -> Self {
        LiveLevelConfig { env_var: None, check_interval: 1, enabled: false }
    }
}

impl LiveLevelConfig {
    /// Builds a config for `env_var`, enabled by default per spec.md §6.
    pub fn for_env_var(env_var: impl Into<String>) -> Self {
        LiveLevelConfig { env_var: Some(env_var.into()), check_interval: 1, enabled: true }
    }
}

/// Command-line verbosity detector sub-configuration (spec.md §6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliVerbosityConfig {
    /// Argument-string → level mapping.
    pub mapping: BTreeMap<String, Level>,
    /// Whether to scan `std::env::args()` for a match on configuration
    /// apply.
    pub auto_detect: bool,
}

/// A complete, deep-copyable snapshot of the root configuration.
#[derive(Clone)]
pub struct RootConfig {
    /// The root logger's effective level.
    pub level: Level,
    /// The root logger's pipelines.
    pub pipelines: Vec<Pipeline>,
    /// The root logger's propagate flag (spec.md: always true by
    /// convention, but still settable).
    pub propagate: bool,
    /// Async writer sub-configuration.
    pub async_config: AsyncConfig,
    /// Live-level poller sub-configuration.
    pub live_level: LiveLevelConfig,
    /// CLI verbosity detector sub-configuration.
    pub command_line_verbosity: CliVerbosityConfig,
}

/// One value in a raw, stringly-keyed configuration update, as would
/// arrive from an external configuration-file loader (out of this crate's
/// scope per spec.md §1, but its validated-map contract lives here).
#[derive(Debug, Clone)]
pub enum RawConfigValue {
    /// A level value.
    Level(Level),
    /// A boolean value.
    Bool(bool),
    /// A pipeline list.
    Pipelines(Vec<Pipeline>),
    /// An async sub-configuration.
    Async(AsyncConfig),
    /// A live-level sub-configuration.
    LiveLevel(LiveLevelConfig),
    /// A CLI-verbosity sub-configuration.
    CliVerbosity(CliVerbosityConfig),
}

/// The full set of keys `config()`/`config_raw` recognize.
pub const ROOT_CONFIG_KEYS: &[&str] =
    &["level", "pipelines", "propagate", "async", "live_level", "command_line_verbosity"];

/// The full set of keys a per-logger configuration recognizes. The legacy
/// `outputs` alias is recognized only so it can be rejected with guidance
/// (spec.md §6).
pub const LOGGER_CONFIG_KEYS: &[&str] = &["level", "pipelines", "propagate"];

/// Typed, ergonomic update builder for [`config`]. Every field left `None`
/// leaves the corresponding root setting untouched.
#[derive(Default)]
pub struct ConfigUpdates {
    /// New root level, if provided.
    pub level: Option<Level>,
    /// New root pipelines, if provided.
    pub pipelines: Option<Vec<Pipeline>>,
    /// New root propagate flag, if provided.
    pub propagate: Option<bool>,
    /// New async sub-configuration, if provided.
    pub async_config: Option<AsyncConfig>,
    /// New live-level sub-configuration, if provided.
    pub live_level: Option<LiveLevelConfig>,
    /// New CLI-verbosity sub-configuration, if provided.
    pub command_line_verbosity: Option<CliVerbosityConfig>,
}

impl ConfigUpdates {
    fn into_raw(self) -> BTreeMap<String, RawConfigValue> {
        let mut map = BTreeMap::new();
        if let Some(v) = self.level {
            map.insert("level".to_string(), RawConfigValue::Level(v));
        }
        if let Some(v) = self.pipelines {
            map.insert("pipelines".to_string(), RawConfigValue::Pipelines(v));
        }
        if let Some(v) = self.propagate {
            map.insert("propagate".to_string(), RawConfigValue::Bool(v));
        }
        if let Some(v) = self.async_config {
            map.insert("async".to_string(), RawConfigValue::Async(v));
        }
        if let Some(v) = self.live_level {
            map.insert("live_level".to_string(), RawConfigValue::LiveLevel(v));
        }
        if let Some(v) = self.command_line_verbosity {
            map.insert("command_line_verbosity".to_string(), RawConfigValue::CliVerbosity(v));
        }
        map
    }
}

struct ExtraState {
    async_config: AsyncConfig,
    live_level: LiveLevelConfig,
    command_line_verbosity: CliVerbosityConfig,
}

impl Default for ExtraState {
    fn default() -> Self {
        ExtraState {
            async_config: AsyncConfig::default(),
            live_level: LiveLevelConfig::default(),
            command_line_verbosity: CliVerbosityConfig::default(),
        }
    }
}

static EXTRA: Lazy<RwLock<ExtraState>> = Lazy::new(|| RwLock::new(ExtraState::default()));
static LIVE_LEVEL_COUNTER: AtomicU64 = AtomicU64::new(0);
static LIVE_LEVEL_LAST_SEEN: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

/// The root logger's current effective level, re-read on every call (this
/// is the mutable source of truth [`crate::dispatch::effective_level`]
/// consults for `_root`).
pub fn root_level() -> Level {
    registry::get_existing(ROOT_NAME).map(|s| *s.level.read().unwrap()).unwrap_or(Level::WARNING)
}

/// Whether the async writer is currently enabled.
pub fn async_enabled() -> bool {
    EXTRA.read().unwrap().async_config.enabled
}

/// The current async sub-configuration.
pub fn async_config() -> AsyncConfig {
    EXTRA.read().unwrap().async_config.clone()
}

/// Returns a deep copy of the full root configuration.
pub fn get_config() -> RootConfig {
    let root = registry::logger(ROOT_NAME, None).expect(ROOT_NAME);
    let extra = EXTRA.read().unwrap();
    RootConfig {
        level: root.level(),
        pipelines: root.get_config().pipelines.unwrap_or_default(),
        propagate: root.propagate(),
        async_config: extra.async_config.clone(),
        live_level: extra.live_level.clone(),
        command_line_verbosity: extra.command_line_verbosity.clone(),
    }
}

/// Applies a typed set of updates; only the provided fields change.
pub fn config(updates: ConfigUpdates) -> Result<RootConfig, GroveError> {
    config_raw(updates.into_raw())
}

/// Applies a raw, stringly-keyed set of updates (spec.md §4.F/§6's actual
/// validation contract). Any unrecognized key fails the whole call with
/// [`GroveError::UnknownKey`] before any field is touched.
pub fn config_raw(updates: BTreeMap<String, RawConfigValue>) -> Result<RootConfig, GroveError> {
    for key in updates.keys() {
        if !ROOT_CONFIG_KEYS.contains(&key.as_str()) {
            return Err(GroveError::UnknownKey { key: key.clone(), valid: ROOT_CONFIG_KEYS });
        }
    }

    let explicit_level = match updates.get("level") {
        Some(RawConfigValue::Level(l)) => {
            if *l == Level::NOTSET {
                return Err(GroveError::InvalidLevel("root level may not be NOTSET".to_string()));
            }
            Some(*l)
        }
        Some(_) => return Err(GroveError::InvalidType { key: "level", expected: "a level" }),
        None => None,
    };

    let pipelines = match updates.get("pipelines") {
        Some(RawConfigValue::Pipelines(ps)) => Some(ps.clone()),
        Some(_) => return Err(GroveError::InvalidType { key: "pipelines", expected: "a pipeline list" }),
        None => None,
    };

    let propagate = match updates.get("propagate") {
        Some(RawConfigValue::Bool(b)) => Some(*b),
        Some(_) => return Err(GroveError::InvalidType { key: "propagate", expected: "a boolean" }),
        None => None,
    };

    let async_update = match updates.get("async") {
        Some(RawConfigValue::Async(cfg)) => Some(cfg.clone()),
        Some(_) => return Err(GroveError::InvalidType { key: "async", expected: "an async sub-configuration" }),
        None => None,
    };

    let live_level_update = match updates.get("live_level") {
        Some(RawConfigValue::LiveLevel(cfg)) => Some(cfg.clone()),
        Some(_) => return Err(GroveError::InvalidType { key: "live_level", expected: "a live-level sub-configuration" }),
        None => None,
    };

    let cli_update = match updates.get("command_line_verbosity") {
        Some(RawConfigValue::CliVerbosity(cfg)) => Some(cfg.clone()),
        Some(_) => {
            return Err(GroveError::InvalidType { key: "command_line_verbosity", expected: "a CLI-verbosity sub-configuration" })
        }
        None => None,
    };

    // Open Question resolution (spec.md §9): an explicit `level` in this
    // same call always wins; `command_line_verbosity.auto_detect` applies
    // once, only when `level` was not also given here.
    let mut resolved_level = explicit_level;
    if resolved_level.is_none() {
        if let Some(cfg) = &cli_update {
            if cfg.auto_detect {
                resolved_level = crate::cli_verbosity::detect(cfg);
            }
        }
    }

    let root = registry::logger(ROOT_NAME, None).expect(ROOT_NAME);
    if let Some(level) = resolved_level {
        root.set_level(level);
    }
    if let Some(ps) = pipelines {
        root.set_pipelines(ps);
    }
    if let Some(p) = propagate {
        root.set_propagate(p);
    }
    if let Some(cfg) = async_update {
        EXTRA.write().unwrap().async_config = cfg.clone();
        crate::async_writer::reconfigure(cfg);
    }
    if let Some(cfg) = live_level_update {
        EXTRA.write().unwrap().live_level = cfg;
        LIVE_LEVEL_COUNTER.store(0, Ordering::SeqCst);
        *LIVE_LEVEL_LAST_SEEN.lock().unwrap() = None;
    }
    if let Some(cfg) = cli_update {
        EXTRA.write().unwrap().command_line_verbosity = cfg;
    }

    Ok(get_config())
}

/// Validates a set of logger-level configuration keys (spec.md §6): only
/// `level`, `pipelines`, `propagate` are recognized; the legacy `outputs`
/// alias is explicitly rejected with guidance rather than silently
/// ignored.
pub fn validate_logger_config_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Result<(), GroveError> {
    for key in keys {
        if key == "outputs" {
            return Err(GroveError::DeprecatedKey { key: "outputs", guidance: "use `pipelines` instead" });
        }
        if !LOGGER_CONFIG_KEYS.contains(&key) {
            return Err(GroveError::UnknownKey { key: key.to_string(), valid: LOGGER_CONFIG_KEYS });
        }
    }
    Ok(())
}

/// Restores defaults: `level = WARNING`, `propagate = true`, one default
/// pipeline (console output + text presenter), async/live-level/CLI
/// sub-configs reset, the logger cache emptied, and the level registry's
/// custom levels dropped (spec.md §4.F, invariant 5).
pub fn reset_config() {
    crate::async_writer::shutdown();
    registry::reset_cache();
    crate::level::reset_registry();
    let root = registry::logger(ROOT_NAME, None).expect(ROOT_NAME);
    root.set_pipelines(vec![crate::builtin::default_pipeline()]);
    *EXTRA.write().unwrap() = ExtraState::default();
    LIVE_LEVEL_COUNTER.store(0, Ordering::SeqCst);
    *LIVE_LEVEL_LAST_SEEN.lock().unwrap() = None;
}

/// Called on every log call (spec.md §6's live-level poller: "every
/// `check_interval` log calls"), before the early-exit level check so the
/// count reflects every attempted call, not only emitted ones.
pub fn note_log_call() {
    let extra = EXTRA.read().unwrap();
    if !extra.live_level.enabled {
        return;
    }
    let interval = extra.live_level.check_interval.max(1);
    let env_var = match &extra.live_level.env_var {
        Some(v) => v.clone(),
        None => return,
    };
    drop(extra);

    let n = LIVE_LEVEL_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
    if n % interval != 0 {
        return;
    }
    crate::live_level::poll(&env_var, &LIVE_LEVEL_LAST_SEEN);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reset_config_restores_documented_defaults() {
        reset_config();
        let cfg = get_config();
        assert_eq!(cfg.level, Level::WARNING);
        assert_eq!(cfg.pipelines.len(), 1);
        assert!(cfg.propagate);
        assert!(!cfg.async_config.enabled);
    }

    #[test]
    fn unknown_key_is_rejected_and_nothing_changes() {
        reset_config();
        let before = get_config().level;
        let mut updates = BTreeMap::new();
        updates.insert("level".to_string(), RawConfigValue::Level(Level::DEBUG));
        updates.insert("bogus".to_string(), RawConfigValue::Bool(true));
        let err = config_raw(updates).unwrap_err();
        assert!(matches!(err, GroveError::UnknownKey { .. }));
        assert_eq!(get_config().level, before);
    }

    #[test]
    fn root_level_may_not_be_notset() {
        reset_config();
        let mut updates = BTreeMap::new();
        updates.insert("level".to_string(), RawConfigValue::Level(Level::NOTSET));
        assert!(matches!(config_raw(updates), Err(GroveError::InvalidLevel(_))));
    }

    #[test]
    fn config_round_trips_get_config() {
        reset_config();
        let snapshot = get_config();
        config(ConfigUpdates { level: Some(snapshot.level), ..Default::default() }).unwrap();
        assert_eq!(get_config().level, snapshot.level);
    }

    #[test]
    fn legacy_outputs_alias_is_rejected_with_guidance() {
        let err = validate_logger_config_keys(["level", "outputs"].into_iter()).unwrap_err();
        assert!(matches!(err, GroveError::DeprecatedKey { key: "outputs", .. }));
    }
}
