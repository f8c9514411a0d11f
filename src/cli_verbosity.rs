//! Command-line verbosity detector (spec.md §6).
//!
//! Applied once, at `config()` time, when
//! `command_line_verbosity.auto_detect` is set and no explicit `level` was
//! given in the same call (see the Open Question resolution in
//! `crate::config::config_raw`).
use std::collections::BTreeMap;

use crate::config::CliVerbosityConfig;
use crate::level::Level;

/// Scans `std::env::args()` (skipping argv\[0\]) against `cfg.mapping`,
/// returning the level of the last matching argument, if any.
///
/// An argument of the form `-v`, `-vv`, `-vvv`, ... is matched against the
/// mapping key made of just its `v`s (`"v"`, `"vv"`, `"vvv"`); any other
/// argument is matched against the mapping verbatim (e.g. `"--debug"`).
pub fn detect(cfg: &CliVerbosityConfig) -> Option<Level> {
    detect_from(&cfg.mapping, std::env::args().skip(1))
}

fn detect_from(mapping: &BTreeMap<String, Level>, args: impl Iterator<Item = String>) -> Option<Level> {
    let mut found = None;
    for arg in args {
        if let Some(key) = short_flag_key(&arg) {
            if let Some(level) = mapping.get(&key) {
                found = Some(*level);
                continue;
            }
        }
        if let Some(level) = mapping.get(&arg) {
            found = Some(*level);
        }
    }
    found
}

fn short_flag_key(arg: &str) -> Option<String> {
    let rest = arg.strip_prefix('-')?;
    if !rest.is_empty() && rest.chars().all(|c| c == 'v') {
        Some(rest.to_string())
    } else {
        None
    }
}
