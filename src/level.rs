//! The level registry (component A).
//!
//! Canonical numeric levels, custom-level registration, and name-to-number
//! mapping. Process-wide, like `fern`'s reliance on `log::LogLevelFilter`,
//! but this crate owns its own registry since custom levels (spec.md §3)
//! have no equivalent in the `log` crate's fixed five-level enum.
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::GroveError;

/// A log level: an integer in `[0, 127]`.
///
/// `NOTSET` (0) means "inherit from an ancestor"; `NONE` (100) disables a
/// logger or pipeline entirely since no real event level can reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub(crate) u8);

impl Level {
    /// Sentinel meaning "not set; inherit from parent".
    pub const NOTSET: Level = Level(0);
    /// Fine-grained diagnostic messages.
    pub const DEBUG: Level = Level(10);
    /// Routine informational messages.
    pub const INFO: Level = Level(20);
    /// Indicates a potential problem.
    pub const WARNING: Level = Level(30);
    /// An operation failed.
    pub const ERROR: Level = Level(40);
    /// The process cannot continue sensibly.
    pub const CRITICAL: Level = Level(50);
    /// Disables emission entirely; nothing is ever `>= NONE`... except
    /// `NONE` itself, which is why thresholds of `NONE` are special-cased
    /// in [`is_enabled`].
    pub const NONE: Level = Level(100);

    /// Builds a `Level` from a raw numeric value, unchecked: it neither
    /// consults the registry nor enforces spec.md §3's documented `[0,
    /// 127]` range. Intended for trusted, compile-time-known values (the
    /// built-in constants above, internal test fixtures); any value parsed
    /// from untrusted external input (an environment variable, a
    /// configuration file) must be range-checked at that call site instead
    /// — see [`crate::live_level::poll`] for the one place this crate
    /// accepts such input. Prefer [`level_of`] when the value comes from a
    /// name.
    pub const fn from_raw(value: u8) -> Level {
        Level(value)
    }

    /// The inclusive upper bound of a valid `Level` value (spec.md §3: "An
    /// integer in `[0, 127]`").
    pub const MAX: u8 = 127;

    /// The raw numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", name_of(*self))
    }
}

struct Registry {
    forward: HashMap<u8, String>,
    reverse: HashMap<String, u8>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();
        for (name, value) in builtins() {
            forward.insert(value, name.to_string());
            reverse.insert(name.to_string(), value);
        }
        Registry { forward, reverse }
    }
}

const fn builtins() -> [(&'static str, u8); 7] {
    [
        ("NOTSET", 0),
        ("DEBUG", 10),
        ("INFO", 20),
        ("WARNING", 30),
        ("ERROR", 40),
        ("CRITICAL", 50),
        ("NONE", 100),
    ]
}

fn is_builtin_value(value: u8) -> bool {
    builtins().iter().any(|&(_, v)| v == value)
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::with_builtins()));

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Looks a level up by its uppercase name.
pub fn level_of(name: &str) -> Result<Level, GroveError> {
    let upper = name.to_ascii_uppercase();
    let reg = REGISTRY.read().unwrap();
    reg.reverse
        .get(&upper)
        .map(|&v| Level(v))
        .ok_or_else(|| GroveError::InvalidName(name.to_string()))
}

/// Returns the name of a level, or a synthesized `Level<n>` for an
/// unregistered custom value.
pub fn name_of(level: Level) -> String {
    let reg = REGISTRY.read().unwrap();
    reg.forward
        .get(&level.0)
        .cloned()
        .unwrap_or_else(|| format!("Level{}", level.0))
}

/// Registers a custom level. Idempotent for an identical `(name, value)`
/// pair; fails otherwise.
pub fn register(name: &str, value: u8) -> Result<(), GroveError> {
    if !valid_name(name) {
        return Err(GroveError::InvalidName(name.to_string()));
    }
    if value == 0 || value >= 100 {
        return Err(GroveError::LevelOutOfRange(value));
    }
    let upper = name.to_ascii_uppercase();
    if is_builtin_value(value) {
        return Err(GroveError::LevelCollision { name: upper, value });
    }

    let mut reg = REGISTRY.write().unwrap();
    if let Some(&existing) = reg.reverse.get(&upper) {
        return if existing == value {
            Ok(())
        } else {
            Err(GroveError::LevelCollision { name: upper, value: existing })
        };
    }
    if let Some(existing_name) = reg.forward.get(&value) {
        if existing_name != &upper {
            return Err(GroveError::LevelCollision { name: existing_name.clone(), value });
        }
    }
    reg.forward.insert(value, upper.clone());
    reg.reverse.insert(upper, value);
    Ok(())
}

/// `true` iff `level >= threshold` and `threshold != NONE`.
pub fn is_enabled(level: Level, threshold: Level) -> bool {
    threshold != Level::NONE && level >= threshold
}

/// Drops every custom level registration, restoring only the built-ins.
/// Called by [`crate::reset_config`].
pub fn reset_registry() {
    let mut reg = REGISTRY.write().unwrap();
    *reg = Registry::with_builtins();
}
