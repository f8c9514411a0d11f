//! Live root-level poller (spec.md §6).
//!
//! Polled from [`crate::config::note_log_call`] every `check_interval` log
//! calls. Reads an environment variable and, when its value has changed
//! since the last poll, applies it as the new root level — letting an
//! operator raise or lower verbosity on a running process without a
//! restart or a config reload.
use std::sync::Mutex;

use crate::diagnostic;
use crate::level::{self, Level};
use crate::registry::{self, ROOT_NAME};

/// Reads `env_var`; if its value differs from `*last_seen`, parses it as a
/// level (by name or by raw numeric value) and applies it to the root
/// logger. Leaves the root level untouched if the variable is unset,
/// unchanged, or unparseable (a parse failure is reported on the
/// diagnostic channel, never surfaced to the caller).
pub fn poll(env_var: &str, last_seen: &Mutex<Option<String>>) {
    let current = match std::env::var(env_var) {
        Ok(v) => v,
        Err(_) => return,
    };

    {
        let mut guard = last_seen.lock().unwrap();
        if guard.as_deref() == Some(current.as_str()) {
            return;
        }
        *guard = Some(current.clone());
    }

    match parse_level(&current) {
        Some(new_level) => {
            if let Some(root) = registry::get_existing(ROOT_NAME) {
                *root.level.write().unwrap() = new_level;
            }
        }
        None => {
            diagnostic::report_error("live level", &format!("could not parse {:?} as a level", current));
        }
    }
}

/// Parses `value` as a level name or a raw numeric value. A numeric value
/// outside spec.md §3's documented `[0, 127]` range is rejected rather than
/// silently truncated or passed through unchecked — this is the one call
/// site in the crate that turns untrusted external input into a `Level`.
fn parse_level(value: &str) -> Option<Level> {
    if let Ok(level) = level::level_of(value) {
        return Some(level);
    }
    let raw: u8 = value.trim().parse().ok()?;
    if raw > Level::MAX {
        return None;
    }
    Some(Level::from_raw(raw))
}
